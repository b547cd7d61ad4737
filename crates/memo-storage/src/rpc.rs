use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::UiTransactionEncoding;
use solana_transaction_status::option_serializer::OptionSerializer;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::network::{AccountSnapshot, ChainNetwork, SignatureEntry, TransactionLogs};

/// [`ChainNetwork`] backed by a Solana JSON-RPC endpoint.
#[derive(Clone)]
pub struct RpcNetwork {
    client: Arc<RpcClient>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcNetwork {
    pub fn new(rpc_url: &str, confirm_timeout: Duration, poll_interval: Duration) -> Self {
        debug!("Creating RPC client for {}", rpc_url);
        let client = RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        Self {
            client: Arc::new(client),
            confirm_timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.rpc_url(),
            config.confirm_timeout,
            config.confirm_poll_interval,
        )
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl ChainNetwork for RpcNetwork {
    async fn minimum_balance_for_rent_exemption(&self, space: usize) -> Result<u64> {
        let lamports = self.client.get_minimum_balance_for_rent_exemption(space).await?;
        debug!("Rent exemption for {} bytes: {} lamports", space, lamports);
        Ok(lamports)
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        let (blockhash, last_valid_height) = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await?;
        debug!("Recent blockhash: {} (valid until height {})", blockhash, last_valid_height);
        Ok(blockhash)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .client
            .send_transaction_with_config(transaction, config)
            .await?;
        debug!("Sent transaction {}", signature);
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<()> {
        let start = Instant::now();
        loop {
            let status = self
                .client
                .get_signature_status_with_commitment(signature, CommitmentConfig::confirmed())
                .await?;

            match status {
                Some(Ok(())) => {
                    info!(
                        "Transaction {} confirmed (took {}ms)",
                        signature,
                        start.elapsed().as_millis()
                    );
                    return Ok(());
                }
                Some(Err(err)) => {
                    return Err(anyhow!("Transaction {} failed: {}", signature, err));
                }
                None => {
                    if start.elapsed() > self.confirm_timeout {
                        return Err(anyhow!(
                            "Transaction {} was not confirmed within {} seconds",
                            signature,
                            self.confirm_timeout.as_secs()
                        ));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await?;
        Ok(response.value.map(|account| AccountSnapshot {
            lamports: account.lamports,
            owner: account.owner,
            data: account.data,
        }))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.client.get_balance(address).await?)
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureEntry>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            until: None,
            limit: Some(limit),
            commitment: Some(CommitmentConfig::confirmed()),
        };
        let statuses = self
            .client
            .get_signatures_for_address_with_config(address, config)
            .await?;
        debug!("Signatures returned for {}: {}", address, statuses.len());

        statuses
            .into_iter()
            .map(|status| {
                Ok(SignatureEntry {
                    signature: Signature::from_str(&status.signature)?,
                    block_time: status.block_time,
                    failed: status.err.is_some(),
                })
            })
            .collect()
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionLogs>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let confirmed = self
            .client
            .get_transaction_with_config(signature, config)
            .await?;

        let log_messages = match confirmed.transaction.meta.map(|meta| meta.log_messages) {
            Some(OptionSerializer::Some(logs)) => logs,
            _ => Vec::new(),
        };

        Ok(Some(TransactionLogs {
            log_messages,
            block_time: confirmed.block_time,
        }))
    }
}
