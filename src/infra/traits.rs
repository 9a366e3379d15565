//! Trait definitions for the registry's external collaborators.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{CiphertextHandle, Record, RecordId};

use super::Result;

/// A transaction that has been submitted but not yet finalized.
///
/// `confirm` resolves once the ledger has finalized the transaction, or
/// fails with `TransactionTimeout` / `TransactionReverted`. There is no
/// cancellation: a submitted transaction runs to completion or times out
/// at the ledger layer.
#[async_trait]
pub trait PendingTransaction: Send {
    async fn confirm(self: Box<Self>) -> Result<TxReceipt>;
}

/// Finalization receipt for a confirmed transaction.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    /// 0x-hex transaction hash.
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Read-only view of the ledger; constructible without a signing identity.
///
/// Read operations must tolerate an empty ledger: `list_record_ids`
/// returns an empty vec, not an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerRead: Send + Sync {
    /// Probe the contract's availability flag.
    async fn is_available(&self) -> Result<bool>;

    /// Enumerate all record ids on the ledger.
    async fn list_record_ids(&self) -> Result<Vec<RecordId>>;

    /// Read a single record's fields as ledger truth.
    async fn get_record(&self, id: &RecordId) -> Result<Record>;

    /// Look up the ciphertext handle for a sealed record.
    async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle>;
}

/// Ciphertext plus validity proof, as submitted at record creation.
#[derive(Debug, Clone)]
pub struct CreateRecordTx {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub handle: CiphertextHandle,
    pub input_proof: Vec<u8>,
    pub public_value1: u32,
    pub public_value2: u32,
}

/// Signer-bound view of the ledger.
///
/// Failure taxonomy: `SubmissionRejected` when the signing identity
/// declines, `AlreadyVerified` when the ledger state shows the record is
/// already revealed, `SubmissionFailed` for any other rejection.
#[async_trait]
pub trait LedgerWrite: LedgerRead {
    /// The 0x-hex account of the bound signing identity.
    fn signer_address(&self) -> String;

    /// Submit a record creation; the ciphertext and proof were produced
    /// client-side before this call.
    async fn create_record(&self, tx: CreateRecordTx) -> Result<Box<dyn PendingTransaction>>;

    /// Submit a decryption proof for on-chain verification.
    async fn submit_decryption_proof(
        &self,
        id: &RecordId,
        abi_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTransaction>>;
}

/// Ciphertext blob and validity proof returned by `encrypt`.
#[derive(Debug, Clone)]
pub struct EncryptedInput {
    /// On-ledger reference to the encrypted value.
    pub handle: CiphertextHandle,
    /// Opaque ciphertext bytes.
    pub ciphertext: Vec<u8>,
    /// Validity proof consumed by the contract at creation.
    pub proof: Vec<u8>,
}

/// Clear values plus a decryption proof suitable for on-chain
/// verification, produced off-chain before submission.
#[derive(Debug, Clone)]
pub struct ProofBundle {
    /// Handle → clear value, in request order.
    pub clear_values: Vec<(CiphertextHandle, u64)>,
    /// ABI-encoded clear values as the contract expects them.
    pub abi_clear_values: Vec<u8>,
    /// Proof that the clear values decrypt the given handles.
    pub proof: Vec<u8>,
}

impl ProofBundle {
    pub fn value_for(&self, handle: &CiphertextHandle) -> Option<u64> {
        self.clear_values
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, v)| *v)
    }
}

/// The opaque homomorphic-encryption capability.
///
/// Implementations must not be called before `init` has completed; the
/// gateway enforces that ordering.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EncryptionBackend: Send + Sync {
    /// One-time setup of the underlying encryption context.
    async fn init(&self) -> Result<()>;

    /// Encrypt a plaintext integer for the target contract on behalf of
    /// the requesting identity.
    async fn encrypt_u64(
        &self,
        target_contract: &str,
        requester: &str,
        value: u64,
    ) -> Result<EncryptedInput>;

    /// Produce clear values and a decryption proof for the given handles.
    /// This is the off-chain half of the two-phase reveal protocol; the
    /// caller submits the bundle to the ledger afterwards.
    async fn prepare_decryption(
        &self,
        handles: &[CiphertextHandle],
        target_contract: &str,
    ) -> Result<ProofBundle>;
}
