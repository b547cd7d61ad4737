use anyhow::anyhow;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use solana_sdk::transaction::Transaction;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    Connected(Pubkey),
    Disconnected,
    /// The user refused the connection request.
    Denied,
}

impl WalletState {
    pub fn pubkey(&self) -> Option<Pubkey> {
        match self {
            WalletState::Connected(pubkey) => Some(*pubkey),
            _ => None,
        }
    }

    /// Connected payer, or the error a wallet-dependent flow must fail with.
    pub fn require_connected(&self) -> Result<Pubkey> {
        match self {
            WalletState::Connected(pubkey) => Ok(*pubkey),
            WalletState::Disconnected => Err(StorageError::WalletMissing),
            WalletState::Denied => Err(StorageError::WalletDenied(
                "Wallet connection was rejected".to_string(),
            )),
        }
    }
}

/// The payer's signing capability.
///
/// `sign_transaction` adds the payer's signature and leaves any other
/// required signatures to the caller.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn state(&self) -> WalletState;

    async fn connect(&mut self) -> Result<Pubkey>;

    async fn disconnect(&mut self) -> Result<()>;

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approval {
    /// Sign without asking.
    #[default]
    Auto,
    /// Ask on the terminal before connecting and before every signature.
    Prompt,
}

/// Wallet holding a local keypair.
pub struct KeypairWallet {
    keypair: Keypair,
    state: WalletState,
    approval: Approval,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, approval: Approval) -> Self {
        Self {
            keypair,
            state: WalletState::Disconnected,
            approval,
        }
    }

    /// Load the payer keypair from `SOLANA_SECRET_KEY` or the keypair file.
    pub fn from_config(config: &Config, approval: Approval) -> anyhow::Result<Self> {
        let keypair = match &config.secret_key {
            Some(secret) => keypair_from_base58(secret)?,
            None => load_keypair_file(&config.keypair_path)?,
        };
        Ok(Self::new(keypair, approval))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn approve(&self, prompt: String) -> Result<bool> {
        match self.approval {
            Approval::Auto => Ok(true),
            Approval::Prompt => tokio::task::spawn_blocking(move || confirm_on_terminal(&prompt))
                .await
                .map_err(|e| StorageError::WalletDenied(format!("Approval prompt failed: {}", e)))?
                .map_err(|e| StorageError::WalletDenied(format!("Approval prompt failed: {}", e))),
        }
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn state(&self) -> WalletState {
        self.state
    }

    async fn connect(&mut self) -> Result<Pubkey> {
        let pubkey = self.keypair.pubkey();
        if !self.approve(format!("Connect wallet {}?", pubkey)).await? {
            self.state = WalletState::Denied;
            return Err(StorageError::WalletDenied(
                "User rejected the connection request".to_string(),
            ));
        }
        self.state = WalletState::Connected(pubkey);
        info!("Wallet connected: {}", pubkey);
        Ok(pubkey)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state = WalletState::Disconnected;
        info!("Wallet disconnected");
        Ok(())
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        self.state.require_connected()?;

        let prompt = format!(
            "Sign transaction with {} instruction(s), fee payer {}?",
            transaction.message.instructions.len(),
            self.keypair.pubkey()
        );
        if !self.approve(prompt).await? {
            return Err(StorageError::WalletDenied(
                "User rejected the request".to_string(),
            ));
        }

        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| StorageError::WalletDenied(format!("Signing failed: {}", e)))?;
        debug!("Transaction signed by {}", self.keypair.pubkey());
        Ok(transaction)
    }
}

fn confirm_on_terminal(prompt: &str) -> io::Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{} [y/N] ", prompt)?;
    stdout.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub fn load_keypair_file(path: &Path) -> anyhow::Result<Keypair> {
    debug!("Reading keypair from {}", path.display());
    read_keypair_file(path)
        .map_err(|e| anyhow!("Failed to read keypair file {}: {}", path.display(), e))
}

pub fn keypair_from_base58(secret: &str) -> anyhow::Result<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|e| anyhow!("Secret key is not valid base58: {}", e))?;
    if bytes.len() != 64 {
        return Err(anyhow!(
            "Secret key must be 64 bytes (secret || public), got {}",
            bytes.len()
        ));
    }
    Keypair::try_from(bytes.as_slice()).map_err(|e| anyhow!("Invalid secret key: {}", e))
}
