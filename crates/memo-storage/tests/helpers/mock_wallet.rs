use async_trait::async_trait;
use memo_storage::{StorageError, WalletSigner, WalletState};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wallet whose approvals are scripted by the test.
pub struct MockWallet {
    keypair: Keypair,
    state: WalletState,
    deny_signing: AtomicBool,
    /// Deny every signature after this many approvals.
    approve_limit: AtomicUsize,
    signed: AtomicUsize,
}

impl MockWallet {
    pub fn connected() -> Self {
        let keypair = Keypair::new();
        let state = WalletState::Connected(keypair.pubkey());
        Self::with_state(keypair, state)
    }

    pub fn disconnected() -> Self {
        Self::with_state(Keypair::new(), WalletState::Disconnected)
    }

    pub fn denied() -> Self {
        Self::with_state(Keypair::new(), WalletState::Denied)
    }

    fn with_state(keypair: Keypair, state: WalletState) -> Self {
        Self {
            keypair,
            state,
            deny_signing: AtomicBool::new(false),
            approve_limit: AtomicUsize::new(usize::MAX),
            signed: AtomicUsize::new(0),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn deny_signing(&self, deny: bool) {
        self.deny_signing.store(deny, Ordering::SeqCst);
    }

    pub fn approve_only(&self, count: usize) {
        self.approve_limit.store(count, Ordering::SeqCst);
    }

    pub fn signed_count(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn state(&self) -> WalletState {
        self.state
    }

    async fn connect(&mut self) -> Result<Pubkey, StorageError> {
        self.state = WalletState::Connected(self.keypair.pubkey());
        Ok(self.keypair.pubkey())
    }

    async fn disconnect(&mut self) -> Result<(), StorageError> {
        self.state = WalletState::Disconnected;
        Ok(())
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction, StorageError> {
        self.state.require_connected()?;
        if self.deny_signing.load(Ordering::SeqCst)
            || self.signed.load(Ordering::SeqCst) >= self.approve_limit.load(Ordering::SeqCst)
        {
            return Err(StorageError::WalletDenied("User rejected the request".to_string()));
        }
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| StorageError::WalletDenied(e.to_string()))?;
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(transaction)
    }
}
