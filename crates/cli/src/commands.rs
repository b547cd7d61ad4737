//! Subcommand handlers.

use anyhow::{anyhow, Result};
use memo_storage::{
    resume, retrieve, store, Approval, ChainNetwork, Config, ContentType, KeypairWallet, Payload,
    PendingStore, RecordSource, RpcNetwork, StorageError, StoredRecord, WalletSigner,
};
use serde::Serialize;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::signature::{read_keypair_file, write_keypair_file};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::status::StatusMessage;

/// Build a payload from `--content` or `--file`.
pub fn read_payload(content: Option<String>, file: Option<PathBuf>, json: bool) -> Result<Payload> {
    let raw = match (content, file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?,
        (None, None) => return Err(anyhow!("Provide --content or --file")),
    };
    let content_type = if json {
        ContentType::Json
    } else {
        ContentType::Text
    };
    Ok(Payload::new(&raw, content_type)?)
}

async fn connect_wallet(config: &Config, approval: Approval) -> Result<KeypairWallet> {
    let mut wallet = KeypairWallet::from_config(config, approval)?;
    wallet.connect().await?;
    Ok(wallet)
}

pub async fn handle_address(config: &Config, approval: Approval) -> Result<()> {
    let network = RpcNetwork::from_config(config);
    let wallet = connect_wallet(config, approval).await?;
    let pubkey = wallet.pubkey();

    let balance = network.get_balance(&pubkey).await?;
    println!("{}", StatusMessage::success("Wallet connected successfully!"));
    println!("Network: {} ({})", config.cluster, network.url());
    println!("Address: {}", pubkey);
    println!(
        "Balance: {} SOL",
        balance as f64 / LAMPORTS_PER_SOL as f64
    );
    Ok(())
}

pub async fn handle_store(
    config: &Config,
    approval: Approval,
    payload: Payload,
    save_keypair: Option<PathBuf>,
) -> Result<()> {
    let network = RpcNetwork::from_config(config);
    let wallet = connect_wallet(config, approval).await?;
    info!(
        "Storing {} bytes of {} on {}",
        payload.byte_len(),
        payload.content_type(),
        config.cluster
    );

    match store(&network, &wallet, &payload, &config.store_options()).await {
        Ok(receipt) => {
            println!(
                "{}",
                StatusMessage::success(format!(
                    "Metadata stored successfully! Account: {}. Memo: {}",
                    receipt.account_address, receipt.memo_signature
                ))
            );
            println!("Creation: {}", receipt.creation_signature);
            Ok(())
        }
        Err(StorageError::MemoNotWritten { pending, source }) => {
            let path = save_keypair
                .unwrap_or_else(|| PathBuf::from(format!("{}.json", pending.account_address())));
            save_pending(&pending, &path)?;
            println!(
                "Storage account kept in {}. Finish with: memo-storage repair --keypair {} ...",
                path.display(),
                path.display()
            );
            Err(StorageError::MemoNotWritten { pending, source }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn save_pending(pending: &PendingStore, path: &Path) -> Result<()> {
    write_keypair_file(pending.storage_keypair(), path)
        .map_err(|e| anyhow!("Failed to save storage keypair to {}: {}", path.display(), e))?;
    debug!("Saved storage keypair for {} to {}", pending.account_address(), path.display());
    Ok(())
}

pub async fn handle_retrieve(config: &Config, address: &str, as_json: bool) -> Result<()> {
    let network = RpcNetwork::from_config(config);
    let record = retrieve(&network, address, &config.retrieve_options()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&RecordOutput::from(&record))?);
        return Ok(());
    }

    println!("{}", StatusMessage::success("Metadata retrieved successfully!"));
    println!("Account: {}", record.account_address);
    println!("Transaction: {}", record.transaction_signature);
    println!("Timestamp: {}", record.timestamp.to_rfc3339());
    println!("Source: {}", source_label(record.source));
    println!();
    println!("{}", record.content);
    Ok(())
}

pub async fn handle_repair(
    config: &Config,
    approval: Approval,
    keypair_path: &Path,
    payload: Payload,
) -> Result<()> {
    let storage_account = read_keypair_file(keypair_path)
        .map_err(|e| anyhow!("Failed to read keypair {}: {}", keypair_path.display(), e))?;
    let network = RpcNetwork::from_config(config);
    let wallet = connect_wallet(config, approval).await?;

    let pending = PendingStore::from_keypair(storage_account, payload);
    let receipt = resume(
        &network,
        &wallet,
        pending,
        &config.store_options(),
        &config.retrieve_options(),
    )
    .await?;

    println!(
        "{}",
        StatusMessage::success(format!(
            "Metadata stored successfully! Account: {}. Memo: {}",
            receipt.account_address, receipt.memo_signature
        ))
    );
    Ok(())
}

fn source_label(source: RecordSource) -> String {
    match source {
        RecordSource::Memo(format) => format!("memo ({})", format),
        RecordSource::AccountData => "account data".to_string(),
    }
}

/// `retrieve --output json` shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordOutput<'a> {
    content: &'a str,
    account_address: String,
    transaction_signature: String,
    timestamp: String,
    source: RecordSource,
}

impl<'a> From<&'a StoredRecord> for RecordOutput<'a> {
    fn from(record: &'a StoredRecord) -> Self {
        Self {
            content: &record.content,
            account_address: record.account_address.to_string(),
            transaction_signature: record.transaction_signature.to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            source: record.source,
        }
    }
}
