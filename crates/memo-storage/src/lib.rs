//! Store short text or JSON payloads on Solana and read them back.
//!
//! A store creates a fresh account sized for the payload and then writes the
//! payload into a memo that references the account. Retrieve walks the
//! account's recent history for that memo, falling back to the account's raw
//! data.

// Module declarations
pub mod config;
pub mod error;
pub mod memo;
pub mod network;
pub mod payload;
pub mod retrieve;
pub mod rpc;
pub mod store;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, StorageError};
pub use memo::MemoFormat;
pub use network::{AccountSnapshot, ChainNetwork, Cluster, SignatureEntry, TransactionLogs};
pub use payload::{ContentType, Payload};
pub use retrieve::{parse_address, retrieve, RecordSource, RetrieveOptions, StoredRecord};
pub use rpc::RpcNetwork;
pub use store::{resume, store, PendingStore, StoreOptions, StoreReceipt};
pub use wallet::{Approval, KeypairWallet, WalletSigner, WalletState};
