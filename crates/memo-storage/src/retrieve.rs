use chrono::{DateTime, Utc};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::memo::{find_record, MemoFormat, MemoRecord};
use crate::network::{ChainNetwork, SignatureEntry};

/// How much of an account's history retrieve is willing to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Signatures requested per history page.
    pub page_size: usize,
    /// Total signatures inspected before giving up.
    pub max_depth: usize,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_depth: 20,
        }
    }
}

/// Where a record was read from. Serializes as `{"kind": "memo", "format": ..}`
/// or `{"kind": "account_data"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "format", rename_all = "snake_case")]
pub enum RecordSource {
    Memo(MemoFormat),
    /// Raw bytes of the account's data region.
    AccountData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub content: String,
    pub account_address: Pubkey,
    pub transaction_signature: Signature,
    pub timestamp: DateTime<Utc>,
    pub source: RecordSource,
}

#[derive(Debug, Clone)]
pub struct FoundRecord {
    pub record: MemoRecord,
    pub entry: SignatureEntry,
    pub block_time: Option<i64>,
}

/// Result of walking an account's history.
#[derive(Debug, Clone, Default)]
pub struct HistoryScan {
    pub newest: Option<SignatureEntry>,
    pub found: Option<FoundRecord>,
    pub inspected: usize,
}

pub fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address.trim())
        .map_err(|e| StorageError::InvalidAddress(format!("{}: {}", address.trim(), e)))
}

/// Recover the record stored for `account_address`.
pub async fn retrieve<N>(
    network: &N,
    account_address: &str,
    options: &RetrieveOptions,
) -> Result<StoredRecord>
where
    N: ChainNetwork + ?Sized,
{
    let address = parse_address(account_address)?;

    let account = network
        .get_account(&address)
        .await?
        .ok_or_else(|| StorageError::not_found("Account not found"))?;

    let scan = scan_history(network, &address, options).await?;
    let newest = scan
        .newest
        .ok_or_else(|| StorageError::not_found("No transactions found for this account"))?;

    if let Some(found) = scan.found {
        info!(
            "Found record for {} in {} after {} transaction(s)",
            address, found.entry.signature, scan.inspected
        );
        return Ok(StoredRecord {
            content: found.record.content,
            account_address: address,
            transaction_signature: found.entry.signature,
            timestamp: timestamp_from(found.entry.block_time.or(found.block_time)),
            source: RecordSource::Memo(found.record.format),
        });
    }

    if !account.data.is_empty() {
        debug!(
            "No memo record in {} transaction(s); falling back to {} bytes of account data",
            scan.inspected,
            account.data.len()
        );
        let content = String::from_utf8_lossy(&account.data)
            .trim_end_matches('\0')
            .to_string();
        return Ok(StoredRecord {
            content,
            account_address: address,
            transaction_signature: newest.signature,
            timestamp: timestamp_from(newest.block_time),
            source: RecordSource::AccountData,
        });
    }

    Err(StorageError::not_found(
        "No metadata found in account or associated transactions",
    ))
}

/// Walk `address`'s history newest first, page by page, stopping at the
/// first memo record for `address` or after `max_depth` signatures. Zero page
/// size or depth is treated as one.
///
/// Transactions that fail to load are logged and skipped.
pub async fn scan_history<N>(
    network: &N,
    address: &Pubkey,
    options: &RetrieveOptions,
) -> Result<HistoryScan>
where
    N: ChainNetwork + ?Sized,
{
    let page_size = options.page_size.max(1);
    let max_depth = options.max_depth.max(1);
    let mut scan = HistoryScan::default();
    let mut before: Option<Signature> = None;

    while scan.inspected < max_depth {
        let limit = page_size.min(max_depth - scan.inspected);
        let page = network
            .signatures_for_address(address, before, limit)
            .await?;
        debug!("History page for {}: {} signature(s)", address, page.len());

        if page.is_empty() {
            break;
        }
        if scan.newest.is_none() {
            scan.newest = page.first().cloned();
        }

        for entry in &page {
            scan.inspected += 1;

            if entry.failed {
                debug!("Skipping failed transaction {}", entry.signature);
                continue;
            }

            match network.get_transaction(&entry.signature).await {
                Ok(Some(transaction)) => {
                    if let Some(record) = find_record(&transaction.log_messages, address) {
                        scan.found = Some(FoundRecord {
                            record,
                            entry: entry.clone(),
                            block_time: transaction.block_time,
                        });
                        return Ok(scan);
                    }
                }
                Ok(None) => debug!("Transaction {} not available", entry.signature),
                Err(e) => warn!("Error processing transaction {}: {}", entry.signature, e),
            }
        }

        if page.len() < limit {
            break;
        }
        before = page.last().map(|entry| entry.signature);
    }

    Ok(scan)
}

/// Oldest signature reachable within `max_depth`, normally the account's
/// creation transaction.
pub async fn oldest_entry<N>(
    network: &N,
    address: &Pubkey,
    options: &RetrieveOptions,
) -> Result<Option<SignatureEntry>>
where
    N: ChainNetwork + ?Sized,
{
    let page_size = options.page_size.max(1);
    let max_depth = options.max_depth.max(1);
    let mut oldest: Option<SignatureEntry> = None;
    let mut seen = 0;
    let mut complete = false;

    while seen < max_depth {
        let limit = page_size.min(max_depth - seen);
        let before = oldest.as_ref().map(|entry| entry.signature);
        let page = network.signatures_for_address(address, before, limit).await?;
        seen += page.len();
        let exhausted = page.len() < limit;
        if let Some(last) = page.into_iter().last() {
            oldest = Some(last);
        }
        if exhausted {
            complete = true;
            break;
        }
    }

    if !complete {
        warn!(
            "History of {} is deeper than {} signature(s); creation transaction may be older",
            address, max_depth
        );
    }
    Ok(oldest)
}

fn timestamp_from(block_time: Option<i64>) -> DateTime<Utc> {
    block_time
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
        .unwrap_or_else(Utc::now)
}
