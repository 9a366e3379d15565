//! In-memory ledger backend with contract-equivalent semantics.
//!
//! Used for local development and tests. Transactions mine instantly:
//! state changes apply at submission and `confirm` resolves immediately.
//! Double-verification is rejected with the same revert reason the
//! on-chain contract uses, so the adapter-level classification paths stay
//! honest.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{CiphertextHandle, Record, RecordId, SealedValue};

use super::error::{RegistryError, Result};
use super::traits::{CreateRecordTx, LedgerRead, LedgerWrite, PendingTransaction, TxReceipt};

/// Revert reason raised by the contract when a decryption proof targets an
/// already-revealed record. Must stay in sync with the EVM adapter's
/// classification.
pub const ALREADY_VERIFIED_REASON: &str = "Data already verified";

#[derive(Debug, Clone)]
struct StoredRecord {
    name: String,
    description: String,
    public_value1: u32,
    public_value2: u32,
    handle: CiphertextHandle,
    verified: bool,
    clear_value: u64,
    creator: String,
    created_at: chrono::DateTime<Utc>,
}

/// Failure to inject into the next write, for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Signer declines the transaction.
    Reject,
    /// Ledger-level rejection.
    Fail,
}

#[derive(Default)]
struct LedgerState {
    records: HashMap<RecordId, StoredRecord>,
    // Insertion order, so list reads are stable.
    order: Vec<RecordId>,
}

/// Shared in-memory ledger. Clones share state, so several client views
/// (different signers) can race against the same ledger in tests.
#[derive(Clone)]
pub struct InMemoryLedger {
    signer: String,
    state: Arc<RwLock<LedgerState>>,
    next_create_failure: Arc<Mutex<Option<InjectedFailure>>>,
    create_calls: Arc<AtomicUsize>,
    proof_calls: Arc<AtomicUsize>,
    accepted_proofs: Arc<AtomicUsize>,
}

impl InMemoryLedger {
    pub fn new(signer: impl Into<String>) -> Self {
        Self {
            signer: signer.into(),
            state: Arc::new(RwLock::new(LedgerState::default())),
            next_create_failure: Arc::new(Mutex::new(None)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            proof_calls: Arc::new(AtomicUsize::new(0)),
            accepted_proofs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A second client view over the same ledger state, bound to a
    /// different signing identity.
    pub fn with_signer(&self, signer: impl Into<String>) -> Self {
        Self {
            signer: signer.into(),
            ..self.clone()
        }
    }

    /// Make the next `create_record` fail with the given mode.
    pub async fn inject_create_failure(&self, failure: InjectedFailure) {
        *self.next_create_failure.lock().await = Some(failure);
    }

    /// Number of `create_record` submissions accepted or rejected so far.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `submit_decryption_proof` submissions so far.
    pub fn proof_calls(&self) -> usize {
        self.proof_calls.load(Ordering::SeqCst)
    }

    /// Number of decryption proofs the ledger has accepted.
    pub fn accepted_proofs(&self) -> usize {
        self.accepted_proofs.load(Ordering::SeqCst)
    }

    fn to_record(id: &RecordId, stored: &StoredRecord) -> Record {
        Record {
            id: id.clone(),
            name: stored.name.clone(),
            description: stored.description.clone(),
            public_value1: stored.public_value1,
            public_value2: stored.public_value2,
            value: if stored.verified {
                SealedValue::Revealed {
                    clear_value: stored.clear_value,
                }
            } else {
                SealedValue::Sealed
            },
            creator: stored.creator.clone(),
            created_at: stored.created_at,
        }
    }

    fn receipt() -> TxReceipt {
        TxReceipt {
            tx_hash: format!("0x{}", hex::encode(rand::random::<[u8; 32]>())),
            block_number: Some(0),
        }
    }
}

/// Decode the first 32-byte ABI word as a big-endian u64 (the layout of
/// `abi.encode(uint64)`).
fn decode_abi_u64(abi_clear_values: &[u8]) -> Result<u64> {
    if abi_clear_values.len() < 32 {
        return Err(RegistryError::SubmissionFailed(
            "malformed clear values".to_string(),
        ));
    }
    let mut word = [0u8; 8];
    word.copy_from_slice(&abi_clear_values[24..32]);
    Ok(u64::from_be_bytes(word))
}

struct InstantTx {
    receipt: TxReceipt,
}

#[async_trait]
impl PendingTransaction for InstantTx {
    async fn confirm(self: Box<Self>) -> Result<TxReceipt> {
        Ok(self.receipt)
    }
}

#[async_trait]
impl LedgerRead for InMemoryLedger {
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    async fn list_record_ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.state.read().await.order.clone())
    }

    async fn get_record(&self, id: &RecordId) -> Result<Record> {
        let state = self.state.read().await;
        state
            .records
            .get(id)
            .map(|stored| Self::to_record(id, stored))
            .ok_or_else(|| RegistryError::RecordNotFound(id.clone()))
    }

    async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle> {
        let state = self.state.read().await;
        state
            .records
            .get(id)
            .map(|stored| stored.handle)
            .ok_or_else(|| RegistryError::RecordNotFound(id.clone()))
    }
}

#[async_trait]
impl LedgerWrite for InMemoryLedger {
    fn signer_address(&self) -> String {
        self.signer.clone()
    }

    async fn create_record(&self, tx: CreateRecordTx) -> Result<Box<dyn PendingTransaction>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = self.next_create_failure.lock().await.take() {
            return Err(match failure {
                InjectedFailure::Reject => {
                    RegistryError::SubmissionRejected("user rejected transaction".to_string())
                }
                InjectedFailure::Fail => {
                    RegistryError::SubmissionFailed("execution reverted".to_string())
                }
            });
        }

        if tx.input_proof.is_empty() {
            return Err(RegistryError::SubmissionFailed(
                "invalid input proof".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if state.records.contains_key(&tx.id) {
            return Err(RegistryError::SubmissionFailed(format!(
                "record id already exists: {}",
                tx.id
            )));
        }

        state.records.insert(
            tx.id.clone(),
            StoredRecord {
                name: tx.name,
                description: tx.description,
                public_value1: tx.public_value1,
                public_value2: tx.public_value2,
                handle: tx.handle,
                verified: false,
                clear_value: 0,
                creator: self.signer.clone(),
                created_at: Utc::now(),
            },
        );
        state.order.push(tx.id);

        Ok(Box::new(InstantTx {
            receipt: Self::receipt(),
        }))
    }

    async fn submit_decryption_proof(
        &self,
        id: &RecordId,
        abi_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTransaction>> {
        self.proof_calls.fetch_add(1, Ordering::SeqCst);

        if proof.is_empty() {
            return Err(RegistryError::SubmissionFailed(
                "invalid decryption proof".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let stored = state
            .records
            .get_mut(id)
            .ok_or_else(|| RegistryError::RecordNotFound(id.clone()))?;

        if stored.verified {
            // Same condition the contract reverts with; surfaced as the
            // distinguishable already-verified error.
            tracing::debug!(record_id = %id, reason = ALREADY_VERIFIED_REASON, "proof rejected");
            return Err(RegistryError::AlreadyVerified(id.clone()));
        }

        stored.clear_value = decode_abi_u64(&abi_clear_values)?;
        stored.verified = true;
        self.accepted_proofs.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(InstantTx {
            receipt: Self::receipt(),
        }))
    }
}
