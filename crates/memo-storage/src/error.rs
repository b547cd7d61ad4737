use thiserror::Error;

use crate::store::PendingStore;

/// Errors surfaced by the store, retrieve and resume procedures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Wallet not connected. Please connect your wallet first")]
    WalletMissing,

    #[error("Wallet request denied: {0}")]
    WalletDenied(String),

    #[error("Network error: {0}")]
    Network(#[from] anyhow::Error),

    #[error("{0}")]
    NotFound(String),

    /// The storage account was created but the memo transaction did not land.
    /// `pending` can be handed to [`crate::resume`] to finish the write.
    #[error("Account {} was created but the memo was not written: {source}", .pending.account_address())]
    MemoNotWritten {
        pending: Box<PendingStore>,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        StorageError::NotFound(msg.into())
    }

    /// Short machine-readable code, used by the CLI's JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::InvalidInput(_) => "INVALID_INPUT",
            StorageError::InvalidAddress(_) => "INVALID_ADDRESS",
            StorageError::WalletMissing => "WALLET_MISSING",
            StorageError::WalletDenied(_) => "WALLET_DENIED",
            StorageError::Network(_) => "NETWORK_ERROR",
            StorageError::NotFound(_) => "NOT_FOUND",
            StorageError::MemoNotWritten { .. } => "MEMO_NOT_WRITTEN",
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
