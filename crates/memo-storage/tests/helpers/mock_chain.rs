use anyhow::{anyhow, Result};
use async_trait::async_trait;
use memo_storage::memo::MEMO_PROGRAM_ID;
use memo_storage::{AccountSnapshot, ChainNetwork, SignatureEntry, TransactionLogs};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_instruction::SystemInstruction;
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const PAYER_BALANCE: u64 = 10_000_000_000;
const GENESIS_TIME: i64 = 1_700_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub rent: usize,
    pub blockhash: usize,
    pub send: usize,
    pub confirm: usize,
    pub get_account: usize,
    pub signatures: usize,
    pub get_transaction: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.rent
            + self.blockhash
            + self.send
            + self.confirm
            + self.get_account
            + self.signatures
            + self.get_transaction
    }
}

#[derive(Default)]
struct ChainState {
    accounts: HashMap<Pubkey, AccountSnapshot>,
    /// Oldest first.
    history: HashMap<Pubkey, Vec<SignatureEntry>>,
    transactions: HashMap<Signature, TransactionLogs>,
    clock: i64,
    calls: CallCounts,
    reject_memos: bool,
    broken: HashSet<Signature>,
}

/// In-memory cluster that executes system `create_account` and memo
/// instructions the way the real programs log them.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<RwLock<ChainState>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> CallCounts {
        self.state.read().await.calls.clone()
    }

    pub async fn reset_calls(&self) {
        self.state.write().await.calls = CallCounts::default();
    }

    /// Make every transaction containing a memo instruction fail on submit.
    pub async fn reject_memos(&self, reject: bool) {
        self.state.write().await.reject_memos = reject;
    }

    /// Make `get_transaction` fail for `signature`.
    pub async fn break_transaction(&self, signature: Signature) {
        self.state.write().await.broken.insert(signature);
    }

    pub async fn block_time(&self, signature: &Signature) -> Option<i64> {
        self.state
            .read()
            .await
            .transactions
            .get(signature)
            .and_then(|tx| tx.block_time)
    }

    pub async fn history_len(&self, address: &Pubkey) -> usize {
        self.state
            .read()
            .await
            .history
            .get(address)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Record `count` unrelated transactions touching `address`, newer than
    /// anything already there.
    pub async fn add_noise(&self, address: &Pubkey, count: usize) {
        let mut state = self.state.write().await;
        for i in 0..count {
            let signature = Signature::new_unique();
            let logs = vec![
                "Program 11111111111111111111111111111111 invoke [1]".to_string(),
                format!("Program log: noise {}", i),
                "Program 11111111111111111111111111111111 success".to_string(),
            ];
            state.record(signature, logs, &[*address], false);
        }
    }

    /// Record a memo transaction for `address` with an arbitrary memo text.
    pub async fn add_memo_log(&self, address: &Pubkey, memo: &str) -> Signature {
        let mut state = self.state.write().await;
        let signature = Signature::new_unique();
        let logs = memo_program_logs(memo, &[*address]);
        state.record(signature, logs, &[*address], false);
        signature
    }

    /// Record a failed transaction that still carries memo logs.
    pub async fn add_failed_memo_log(&self, address: &Pubkey, memo: &str) -> Signature {
        let mut state = self.state.write().await;
        let signature = Signature::new_unique();
        let logs = memo_program_logs(memo, &[*address]);
        state.record(signature, logs, &[*address], true);
        signature
    }

    /// Insert an account with no history at all.
    pub async fn put_account(&self, address: &Pubkey, data: Vec<u8>) {
        self.state.write().await.accounts.insert(
            *address,
            AccountSnapshot {
                lamports: rent_for(data.len()),
                owner: system_program::id(),
                data,
            },
        );
    }

    /// Create an account directly, with a creation entry in its history.
    pub async fn create_account(&self, address: &Pubkey, data: Vec<u8>) -> Signature {
        let mut state = self.state.write().await;
        state.accounts.insert(
            *address,
            AccountSnapshot {
                lamports: rent_for(data.len()),
                owner: system_program::id(),
                data,
            },
        );
        let signature = Signature::new_unique();
        state.record(signature, Vec::new(), &[*address], false);
        signature
    }
}

impl ChainState {
    fn record(&mut self, signature: Signature, logs: Vec<String>, keys: &[Pubkey], failed: bool) {
        self.clock += 1;
        let block_time = Some(GENESIS_TIME + self.clock);
        for key in keys {
            self.history.entry(*key).or_default().push(SignatureEntry {
                signature,
                block_time,
                failed,
            });
        }
        self.transactions.insert(
            signature,
            TransactionLogs {
                log_messages: logs,
                block_time,
            },
        );
    }
}

fn rent_for(space: usize) -> u64 {
    (128 + space as u64) * 3480 * 2
}

fn memo_program_logs(memo: &str, signers: &[Pubkey]) -> Vec<String> {
    let mut logs = vec![format!("Program {} invoke [1]", MEMO_PROGRAM_ID)];
    for signer in signers {
        logs.push(format!("Program log: Signed by {}", signer));
    }
    logs.push(format!("Program log: Memo (len {}): {:?}", memo.len(), memo));
    logs.push(format!("Program {} success", MEMO_PROGRAM_ID));
    logs
}

#[async_trait]
impl ChainNetwork for MockChain {
    async fn minimum_balance_for_rent_exemption(&self, space: usize) -> Result<u64> {
        self.state.write().await.calls.rent += 1;
        Ok(rent_for(space))
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.state.write().await.calls.blockhash += 1;
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let mut state = self.state.write().await;
        state.calls.send += 1;

        transaction
            .verify()
            .map_err(|e| anyhow!("Transaction signature verification failure: {}", e))?;

        let keys = &transaction.message.account_keys;
        let mut logs = Vec::new();
        let mut created = Vec::new();

        for instruction in &transaction.message.instructions {
            let program_id = keys[instruction.program_id_index as usize];
            if program_id == system_program::id() {
                match bincode::deserialize::<SystemInstruction>(&instruction.data)? {
                    SystemInstruction::CreateAccount { lamports, space, owner } => {
                        let new_account = keys[instruction.accounts[1] as usize];
                        if state.accounts.contains_key(&new_account) {
                            return Err(anyhow!("Account {} already in use", new_account));
                        }
                        logs.push(format!("Program {} invoke [1]", program_id));
                        logs.push(format!("Program {} success", program_id));
                        created.push((
                            new_account,
                            AccountSnapshot {
                                lamports,
                                owner,
                                data: vec![0; space as usize],
                            },
                        ));
                    }
                    other => return Err(anyhow!("Unsupported system instruction: {:?}", other)),
                }
            } else if program_id == MEMO_PROGRAM_ID {
                if state.reject_memos {
                    return Err(anyhow!("Transaction simulation failed: memo rejected"));
                }
                let memo = std::str::from_utf8(&instruction.data)
                    .map_err(|e| anyhow!("Invalid memo: {}", e))?;
                let signers: Vec<Pubkey> = instruction
                    .accounts
                    .iter()
                    .map(|index| keys[*index as usize])
                    .collect();
                logs.extend(memo_program_logs(memo, &signers));
            } else {
                return Err(anyhow!("Unknown program {}", program_id));
            }
        }

        for (address, account) in created {
            state.accounts.insert(address, account);
        }

        let signature = transaction.signatures[0];
        let touched: Vec<Pubkey> = keys
            .iter()
            .filter(|key| **key != system_program::id() && **key != MEMO_PROGRAM_ID)
            .copied()
            .collect();
        state.record(signature, logs, &touched, false);
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<()> {
        let mut state = self.state.write().await;
        state.calls.confirm += 1;
        if state.transactions.contains_key(signature) {
            Ok(())
        } else {
            Err(anyhow!("Transaction {} was not confirmed", signature))
        }
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>> {
        let mut state = self.state.write().await;
        state.calls.get_account += 1;
        Ok(state.accounts.get(address).cloned())
    }

    async fn get_balance(&self, _address: &Pubkey) -> Result<u64> {
        Ok(PAYER_BALANCE)
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureEntry>> {
        let mut state = self.state.write().await;
        state.calls.signatures += 1;

        let history = match state.history.get(address) {
            Some(history) => history,
            None => return Ok(Vec::new()),
        };
        let newest_first = history.iter().rev();
        let page: Vec<SignatureEntry> = match before {
            Some(cursor) => newest_first
                .skip_while(|entry| entry.signature != cursor)
                .skip(1)
                .take(limit)
                .cloned()
                .collect(),
            None => newest_first.take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionLogs>> {
        let mut state = self.state.write().await;
        state.calls.get_transaction += 1;
        if state.broken.contains(signature) {
            return Err(anyhow!("RPC response error: transaction {} unavailable", signature));
        }
        Ok(state.transactions.get(signature).cloned())
    }
}
