//! Two-phase write: create a storage account sized for the payload, then
//! record the payload in a memo that references that account.
//!
//! Phase one is confirmed before phase two is built. When phase two fails the
//! caller gets the [`PendingStore`] back inside
//! [`StorageError::MemoNotWritten`] and can finish the write with [`resume`].

use anyhow::anyhow;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
#[allow(deprecated)]
use solana_sdk::system_instruction;
#[allow(deprecated)]
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::memo::{encode_record, memo_instruction, MemoFormat};
use crate::network::ChainNetwork;
use crate::payload::Payload;
use crate::retrieve::{oldest_entry, scan_history, RetrieveOptions};
use crate::wallet::WalletSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreOptions {
    pub memo_format: MemoFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    pub account_address: Pubkey,
    pub creation_signature: Signature,
    pub memo_signature: Signature,
    pub content: String,
}

/// A storage account whose memo has not been written yet.
pub struct PendingStore {
    storage_account: Keypair,
    payload: Payload,
    creation_signature: Option<Signature>,
}

impl PendingStore {
    /// Rebuild pending state from a saved storage keypair, e.g. after the
    /// process that created the account exited.
    pub fn from_keypair(storage_account: Keypair, payload: Payload) -> Self {
        Self {
            storage_account,
            payload,
            creation_signature: None,
        }
    }

    pub fn account_address(&self) -> Pubkey {
        self.storage_account.pubkey()
    }

    pub fn storage_keypair(&self) -> &Keypair {
        &self.storage_account
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn creation_signature(&self) -> Option<Signature> {
        self.creation_signature
    }
}

impl fmt::Debug for PendingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingStore")
            .field("account_address", &self.account_address())
            .field("content_len", &self.payload.byte_len())
            .field("creation_signature", &self.creation_signature)
            .finish()
    }
}

/// Store `payload`: create the storage account, then write the memo.
pub async fn store<N, W>(
    network: &N,
    wallet: &W,
    payload: &Payload,
    options: &StoreOptions,
) -> Result<StoreReceipt>
where
    N: ChainNetwork + ?Sized,
    W: WalletSigner + ?Sized,
{
    let payer = wallet.state().require_connected()?;
    let storage_account = Keypair::new();
    check_memo_fits(&payer, &storage_account.pubkey(), payload, options.memo_format)?;

    let (pending, creation_signature) =
        create_storage_account(network, wallet, payer, storage_account, payload).await?;
    let receipt = write_memo(network, wallet, pending, creation_signature, options).await?;

    // Informational only; a failed lookup does not fail the store.
    match network.get_account(&receipt.account_address).await {
        Ok(Some(account)) => info!(
            "Account created successfully with rent: {} lamports, data length: {}",
            account.lamports,
            account.data.len()
        ),
        Ok(None) => warn!("Account {} not visible yet", receipt.account_address),
        Err(e) => warn!("Failed to verify account {}: {}", receipt.account_address, e),
    }

    Ok(receipt)
}

/// Finish a store whose memo was never written.
///
/// Does nothing but report the existing record when a memo for the account is
/// already in its history.
pub async fn resume<N, W>(
    network: &N,
    wallet: &W,
    pending: PendingStore,
    options: &StoreOptions,
    scan: &RetrieveOptions,
) -> Result<StoreReceipt>
where
    N: ChainNetwork + ?Sized,
    W: WalletSigner + ?Sized,
{
    let payer = wallet.state().require_connected()?;
    let address = pending.account_address();
    check_memo_fits(&payer, &address, &pending.payload, options.memo_format)?;

    if network.get_account(&address).await?.is_none() {
        return Err(StorageError::not_found("Account not found"));
    }

    let history = scan_history(network, &address, scan).await?;
    let creation_signature = match pending.creation_signature {
        Some(signature) => signature,
        None => oldest_entry(network, &address, scan)
            .await?
            .map(|entry| entry.signature)
            .ok_or_else(|| StorageError::not_found("No transactions found for this account"))?,
    };

    if let Some(found) = history.found {
        if found.record.content != pending.payload.content() {
            warn!(
                "Account {} already holds a different record; leaving it unchanged",
                address
            );
        }
        info!("Memo already present for {}: {}", address, found.entry.signature);
        return Ok(StoreReceipt {
            account_address: address,
            creation_signature,
            memo_signature: found.entry.signature,
            content: found.record.content,
        });
    }

    info!("Resuming memo write for {}", address);
    write_memo(network, wallet, pending, creation_signature, options).await
}

/// Phase one: create and confirm the storage account.
#[allow(deprecated)] // system_instruction/system_program moved to solana-system-interface
async fn create_storage_account<N, W>(
    network: &N,
    wallet: &W,
    payer: Pubkey,
    storage_account: Keypair,
    payload: &Payload,
) -> Result<(PendingStore, Signature)>
where
    N: ChainNetwork + ?Sized,
    W: WalletSigner + ?Sized,
{
    let space = payload.byte_len();
    let lamports = network.minimum_balance_for_rent_exemption(space).await?;
    info!("Rent exemption: {} lamports for {} bytes", lamports, space);

    let blockhash = network.latest_blockhash().await?;
    let storage_pubkey = storage_account.pubkey();
    info!("Created metadata account: {}", storage_pubkey);

    let instruction = system_instruction::create_account(
        &payer,
        &storage_pubkey,
        lamports,
        space as u64,
        &system_program::id(),
    );
    let transaction = unsigned_transaction(&[instruction], &payer, blockhash);

    debug!("Requesting wallet signature for account creation");
    let mut transaction = wallet.sign_transaction(transaction).await?;
    co_sign(&mut transaction, &storage_account, blockhash)?;

    let signature = network.send_transaction(&transaction).await?;
    info!("Account creation transaction signature: {}", signature);
    network.confirm_transaction(&signature).await?;

    let pending = PendingStore {
        storage_account,
        payload: payload.clone(),
        creation_signature: Some(signature),
    };
    Ok((pending, signature))
}

/// Phase two: write and confirm the memo. Failures carry `pending` back.
async fn write_memo<N, W>(
    network: &N,
    wallet: &W,
    pending: PendingStore,
    creation_signature: Signature,
    options: &StoreOptions,
) -> Result<StoreReceipt>
where
    N: ChainNetwork + ?Sized,
    W: WalletSigner + ?Sized,
{
    match submit_memo(network, wallet, &pending, options).await {
        Ok(memo_signature) => Ok(StoreReceipt {
            account_address: pending.account_address(),
            creation_signature,
            memo_signature,
            content: pending.payload.content().to_string(),
        }),
        Err(source) => {
            warn!(
                "Memo for account {} was not written: {}",
                pending.account_address(),
                source
            );
            Err(StorageError::MemoNotWritten {
                pending: Box::new(PendingStore {
                    creation_signature: Some(creation_signature),
                    ..pending
                }),
                source: Box::new(source),
            })
        }
    }
}

async fn submit_memo<N, W>(
    network: &N,
    wallet: &W,
    pending: &PendingStore,
    options: &StoreOptions,
) -> Result<Signature>
where
    N: ChainNetwork + ?Sized,
    W: WalletSigner + ?Sized,
{
    let payer = wallet.state().require_connected()?;
    let storage_pubkey = pending.account_address();
    let memo = encode_record(options.memo_format, &storage_pubkey, pending.payload.content());

    info!("Storing metadata in memo ({} format)", options.memo_format);
    let blockhash = network.latest_blockhash().await?;
    let instruction = memo_instruction(&memo, &[&payer, &storage_pubkey]);
    let transaction = unsigned_transaction(&[instruction], &payer, blockhash);

    let mut transaction = wallet.sign_transaction(transaction).await?;
    co_sign(&mut transaction, &pending.storage_account, blockhash)?;

    let signature = network.send_transaction(&transaction).await?;
    info!("Memo transaction signature: {}", signature);
    network.confirm_transaction(&signature).await?;
    Ok(signature)
}

fn unsigned_transaction(
    instructions: &[solana_sdk::instruction::Instruction],
    payer: &Pubkey,
    blockhash: Hash,
) -> Transaction {
    let mut transaction = Transaction::new_unsigned(Message::new(instructions, Some(payer)));
    transaction.message.recent_blockhash = blockhash;
    transaction
}

fn co_sign(transaction: &mut Transaction, signer: &Keypair, blockhash: Hash) -> Result<()> {
    transaction
        .try_partial_sign(&[signer], blockhash)
        .map_err(|e| anyhow!("Failed to co-sign with {}: {}", signer.pubkey(), e))?;
    Ok(())
}

/// Reject payloads whose memo transaction cannot fit in a single packet.
fn check_memo_fits(
    payer: &Pubkey,
    storage: &Pubkey,
    payload: &Payload,
    format: MemoFormat,
) -> Result<()> {
    let memo = encode_record(format, storage, payload.content());
    let instruction = memo_instruction(&memo, &[payer, storage]);
    let transaction = unsigned_transaction(&[instruction], payer, Hash::default());
    let size = bincode::serialized_size(&transaction)
        .map_err(|e| anyhow!("Failed to size memo transaction: {}", e))? as usize;

    if size > PACKET_DATA_SIZE {
        return Err(StorageError::InvalidInput(format!(
            "Payload too large: memo transaction would be {} bytes, the limit is {} bytes",
            size, PACKET_DATA_SIZE
        )));
    }
    debug!("Memo transaction size: {} of {} bytes", size, PACKET_DATA_SIZE);
    Ok(())
}
