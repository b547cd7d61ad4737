use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
}

const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";
const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const LOCALNET_RPC_URL: &str = "http://127.0.0.1:8899";

impl FromStr for Cluster {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            _ => Err(anyhow::anyhow!(
                "Unknown network: {}. Please use 'devnet', 'testnet', 'mainnet', or 'localnet'.",
                s
            )),
        }
    }
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => DEVNET_RPC_URL,
            Cluster::Testnet => TESTNET_RPC_URL,
            Cluster::Mainnet => MAINNET_RPC_URL,
            Cluster::Localnet => LOCALNET_RPC_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Mainnet => "mainnet",
            Cluster::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account state as seen by the procedures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// One entry of an address's signature history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub signature: Signature,
    /// Unix seconds, when the cluster knows it.
    pub block_time: Option<i64>,
    pub failed: bool,
}

/// The parts of a confirmed transaction the retrieve path reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionLogs {
    pub log_messages: Vec<String>,
    pub block_time: Option<i64>,
}

/// Chain operations used by store, retrieve and resume.
///
/// Every method is a single round trip; retry and consistency semantics are
/// the implementation's concern. Commitment is `confirmed` throughout.
#[async_trait]
pub trait ChainNetwork: Send + Sync {
    async fn minimum_balance_for_rent_exemption(&self, space: usize) -> Result<u64>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Wait until `signature` reaches `confirmed`, failing on a transaction
    /// error or timeout.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<()>;

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>>;

    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Signatures referencing `address`, newest first, starting strictly
    /// before `before` when given.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureEntry>>;

    /// Returns `None` when the cluster has no record of the transaction.
    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionLogs>>;
}
