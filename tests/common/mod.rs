//! Common fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sealed_registry::gateway::{EncryptionGateway, LocalBackend};
use sealed_registry::infra::{InMemoryLedger, LedgerRead, LedgerWrite, RetryConfig};
use sealed_registry::orchestrator::RecordOrchestrator;
use sealed_registry::RecordDraft;

/// Registry contract address used by the fixtures.
pub const CONTRACT: &str = "0x00000000000000000000000000000000000000de";

pub const SIGNER_A: &str = "0x00000000000000000000000000000000000000ab";
pub const SIGNER_B: &str = "0x00000000000000000000000000000000000000cd";

/// A client session: one orchestrator over a shared ledger and encryption
/// backend, with the encryption context already initialized.
pub async fn client(
    ledger: &InMemoryLedger,
    backend: &LocalBackend,
    signer: &str,
) -> Arc<RecordOrchestrator> {
    let view = ledger.with_signer(signer);
    let gateway = Arc::new(EncryptionGateway::new(Arc::new(backend.clone()), CONTRACT));
    let orchestrator = Arc::new(
        RecordOrchestrator::new(
            Arc::new(view.clone()) as Arc<dyn LedgerRead>,
            Some(Arc::new(view) as Arc<dyn LedgerWrite>),
            gateway,
        )
        .with_retry_config(RetryConfig::fast().with_max_retries(0)),
    );
    orchestrator.initialize_encryption().await.unwrap();
    orchestrator
}

/// A read-only client session: no signing identity attached.
pub async fn read_only_client(
    ledger: &InMemoryLedger,
    backend: &LocalBackend,
) -> Arc<RecordOrchestrator> {
    let gateway = Arc::new(EncryptionGateway::new(Arc::new(backend.clone()), CONTRACT));
    let orchestrator = Arc::new(
        RecordOrchestrator::new(Arc::new(ledger.clone()) as Arc<dyn LedgerRead>, None, gateway)
            .with_retry_config(RetryConfig::fast().with_max_retries(0)),
    );
    orchestrator.initialize_encryption().await.unwrap();
    orchestrator
}

pub fn draft(name: &str, amount: u64, graduation_year: u32) -> RecordDraft {
    RecordDraft {
        name: name.to_string(),
        description: format!("{} donation record", name),
        amount,
        public_value1: graduation_year,
        public_value2: 0,
    }
}
