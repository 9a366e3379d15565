//! Record lifecycle orchestration.
//!
//! Drives the encrypted-value lifecycle (encrypt → submit → confirm →
//! reconcile, and request-decryption → prove → verify → reveal) against
//! the ledger and the encryption gateway, and owns the retry and
//! state-reconciliation policy.
//!
//! Local state is never patched optimistically: after every confirmed
//! mutation the full record collection is re-read from the ledger, so the
//! locally observed state cannot diverge from ledger truth.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{
    FlowKind, Record, RecordDraft, RecordId, RecordFilter, RegistryStats, StatusChannel,
    StatusNotice,
};
use crate::gateway::EncryptionGateway;
use crate::infra::{
    CreateRecordTx, LedgerRead, LedgerWrite, RegistryError, Result, Retry, RetryConfig,
};

/// Prefix for client-generated record ids.
const ID_PREFIX: &str = "grant";

/// Per-operation-class in-flight guard. At most one creation and one
/// decryption runs at a time from a given orchestrator; the flag is
/// released on every exit path.
struct Flight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> Flight<'a> {
    fn acquire(flag: &'a AtomicBool, name: &'static str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RegistryError::OperationInFlight(name))?;
        Ok(Self { flag })
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates record creation and reveal against ledger truth.
pub struct RecordOrchestrator {
    reader: Arc<dyn LedgerRead>,
    writer: Option<Arc<dyn LedgerWrite>>,
    gateway: Arc<EncryptionGateway>,
    records: RwLock<Vec<Record>>,
    status: StatusChannel,
    creating: AtomicBool,
    decrypting: AtomicBool,
    retry: Retry,
}

impl RecordOrchestrator {
    pub fn new(
        reader: Arc<dyn LedgerRead>,
        writer: Option<Arc<dyn LedgerWrite>>,
        gateway: Arc<EncryptionGateway>,
    ) -> Self {
        Self {
            reader,
            writer,
            gateway,
            records: RwLock::new(Vec::new()),
            status: StatusChannel::new(),
            creating: AtomicBool::new(false),
            decrypting: AtomicBool::new(false),
            retry: Retry::new(RetryConfig::ledger_read()),
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = Retry::new(config);
        self
    }

    /// Initialize the process-wide encryption context. Idempotent;
    /// concurrent calls coalesce.
    pub async fn initialize_encryption(&self) -> Result<()> {
        self.gateway.initialize().await
    }

    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    pub fn is_creating(&self) -> bool {
        self.creating.load(Ordering::SeqCst)
    }

    pub fn is_decrypting(&self) -> bool {
        self.decrypting.load(Ordering::SeqCst)
    }

    /// Snapshot of the reconciled record list.
    pub async fn records(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }

    /// Filtered snapshot for the presentation boundary.
    pub async fn filtered_records(
        &self,
        filter: RecordFilter,
        search: Option<&str>,
    ) -> Vec<Record> {
        let records = self.records.read().await;
        crate::domain::filter_records(&records, filter, search)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> RegistryStats {
        RegistryStats::compute(&self.records.read().await)
    }

    fn require_writer(&self) -> Result<&Arc<dyn LedgerWrite>> {
        self.writer
            .as_ref()
            .ok_or_else(|| RegistryError::NotReady("no signing identity connected".to_string()))
    }

    fn require_ready(&self) -> Result<&Arc<dyn LedgerWrite>> {
        let writer = self.require_writer()?;
        if !self.gateway.is_initialized() {
            return Err(RegistryError::NotReady(
                "encryption context not initialized".to_string(),
            ));
        }
        Ok(writer)
    }

    /// Full re-read of the record collection from the ledger. The cache
    /// is only replaced after the whole read succeeds.
    pub async fn load_records(&self) -> Result<Vec<Record>> {
        let reader = self.reader.clone();
        let records = self
            .retry
            .run_with_context("load_records", || Self::fetch_all(reader.clone()))
            .await?;
        *self.records.write().await = records.clone();
        Ok(records)
    }

    /// Background refresh: read failures degrade to the stale list.
    pub async fn refresh(&self) {
        if let Err(e) = self.load_records().await {
            warn!(error = %e, "Record refresh failed, serving stale list");
        }
    }

    async fn fetch_all(reader: Arc<dyn LedgerRead>) -> Result<Vec<Record>> {
        let ids = reader.list_record_ids().await.map_err(|e| match e {
            e @ RegistryError::LoadFailed(_) => e,
            other => RegistryError::LoadFailed(other.to_string()),
        })?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            // A single unreadable record must not take down the list.
            match reader.get_record(&id).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(record_id = %id, error = %e, "Skipping unreadable record"),
            }
        }
        Ok(records)
    }

    /// Create a record: encrypt the confidential amount, submit it with
    /// its validity proof, await confirmation, then reconcile.
    pub async fn create_record(&self, draft: RecordDraft) -> Result<Record> {
        let _flight = Flight::acquire(&self.creating, "create")?;
        self.status.publish(StatusNotice::pending(
            FlowKind::Create,
            "Encrypting and submitting record",
        ));

        match self.create_inner(draft).await {
            Ok(record) => {
                self.status.publish(StatusNotice::success(
                    FlowKind::Create,
                    format!("Record {} created", record.id),
                ));
                Ok(record)
            }
            Err(e) => {
                self.status.publish(StatusNotice::error(
                    FlowKind::Create,
                    format!("Record creation failed: {}", e),
                ));
                Err(e)
            }
        }
    }

    async fn create_inner(&self, draft: RecordDraft) -> Result<Record> {
        let writer = self.require_ready()?;
        let id = RecordId::generate(ID_PREFIX);

        // Encrypt first; on failure nothing has touched the ledger.
        let encrypted = self
            .gateway
            .encrypt(&writer.signer_address(), draft.amount)
            .await?;

        info!(record_id = %id, handle = %encrypted.handle, "Amount encrypted, submitting record");

        let pending = writer
            .create_record(CreateRecordTx {
                id: id.clone(),
                name: draft.name,
                description: draft.description,
                handle: encrypted.handle,
                input_proof: encrypted.proof,
                public_value1: draft.public_value1,
                public_value2: draft.public_value2,
            })
            .await?;

        self.status.publish(StatusNotice::pending(
            FlowKind::Create,
            "Waiting for transaction confirmation",
        ));
        let receipt = pending.confirm().await?;
        info!(record_id = %id, tx_hash = %receipt.tx_hash, "Record creation confirmed");

        // Reconcile against ledger truth before exposing anything locally.
        let records = self.load_records().await?;
        match records.into_iter().find(|r| r.id == id) {
            Some(record) => Ok(record),
            None => self.reader.get_record(&id).await,
        }
    }

    /// Reveal a record's confidential amount.
    ///
    /// Short-circuits when the ledger already attests the clear value, and
    /// treats a concurrent-verification race as success.
    pub async fn decrypt_record(&self, id: &RecordId) -> Result<u64> {
        let _flight = Flight::acquire(&self.decrypting, "decrypt")?;
        self.status.publish(StatusNotice::pending(
            FlowKind::Decrypt,
            format!("Requesting decryption for {}", id),
        ));

        match self.decrypt_inner(id).await {
            Ok(outcome) => {
                let message = match outcome.already_verified {
                    true => "Record already verified on-chain".to_string(),
                    false => "Record decrypted and verified on-chain".to_string(),
                };
                self.status
                    .publish(StatusNotice::success(FlowKind::Decrypt, message));
                Ok(outcome.clear_value)
            }
            Err(e) => {
                self.status.publish(StatusNotice::error(
                    FlowKind::Decrypt,
                    format!("Decryption failed: {}", e),
                ));
                Err(e)
            }
        }
    }

    async fn decrypt_inner(&self, id: &RecordId) -> Result<RevealOutcome> {
        let writer = self.require_writer()?;

        // Re-read before doing anything: an already-revealed record needs
        // no further network calls and no proof resubmission.
        let record = self.reader.get_record(id).await?;
        if let Some(clear_value) = record.clear_value() {
            info!(record_id = %id, "Record already verified, short-circuiting");
            return Ok(RevealOutcome {
                clear_value,
                already_verified: true,
            });
        }

        let handle = self.reader.get_ciphertext_handle(id).await?;
        let bundle = self.gateway.prepare_decryption(&[handle]).await?;

        let pending = match writer
            .submit_decryption_proof(id, bundle.abi_clear_values.clone(), bundle.proof.clone())
            .await
        {
            Ok(pending) => pending,
            Err(e) if e.is_benign_reveal() => {
                // Another party verified this record concurrently; adopt
                // the ledger's value instead of raising an error.
                info!(record_id = %id, "Record verified concurrently by another party");
                self.refresh().await;
                let record = self.reader.get_record(id).await?;
                let clear_value = record
                    .clear_value()
                    .ok_or_else(|| RegistryError::Internal("ledger reported already-verified but record is sealed".to_string()))?;
                return Ok(RevealOutcome {
                    clear_value,
                    already_verified: true,
                });
            }
            Err(e) => return Err(e),
        };

        self.status.publish(StatusNotice::pending(
            FlowKind::Decrypt,
            "Verifying decryption on-chain",
        ));
        let receipt = pending.confirm().await?;
        info!(record_id = %id, tx_hash = %receipt.tx_hash, "Decryption proof confirmed");

        let records = self.load_records().await?;
        let clear_value = records
            .iter()
            .find(|r| r.id == *id)
            .and_then(|r| r.clear_value())
            .or_else(|| bundle.value_for(&handle))
            .ok_or_else(|| {
                RegistryError::Internal("revealed value missing after reload".to_string())
            })?;

        Ok(RevealOutcome {
            clear_value,
            already_verified: false,
        })
    }

    /// Probe the contract's availability flag and report the outcome
    /// through the status channel.
    pub async fn check_availability(&self) -> Result<bool> {
        self.status.publish(StatusNotice::pending(
            FlowKind::Availability,
            "Checking contract availability",
        ));
        match self.reader.is_available().await {
            Ok(available) => {
                let message = if available {
                    "Contract is available"
                } else {
                    "Contract reports unavailable"
                };
                self.status
                    .publish(StatusNotice::success(FlowKind::Availability, message));
                Ok(available)
            }
            Err(e) => {
                self.status.publish(StatusNotice::error(
                    FlowKind::Availability,
                    format!("Availability check failed: {}", e),
                ));
                Err(e)
            }
        }
    }
}

struct RevealOutcome {
    clear_value: u64,
    already_verified: bool,
}
