//! Integration tests for the record lifecycle against the in-memory
//! ledger and the local encryption backend.

mod common;

use pretty_assertions::assert_eq;

use sealed_registry::gateway::LocalBackend;
use sealed_registry::infra::{InMemoryLedger, InjectedFailure, RegistryError};
use sealed_registry::{FlowKind, FlowPhase, RecordId};

use common::{client, draft, read_only_client, SIGNER_A};

#[tokio::test]
async fn test_creation_round_trip_reveals_original_value() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    let record = orchestrator
        .create_record(draft("Jane Doe", 5000, 2020))
        .await
        .unwrap();

    assert!(record.id.as_str().starts_with("grant-"));
    assert!(!record.is_verified());
    assert_eq!(record.public_value1, 2020);
    assert_eq!(record.creator, SIGNER_A);

    // The record is listed on the ledger, still sealed.
    let ids = ledger.list_record_ids().await.unwrap();
    assert_eq!(ids, vec![record.id.clone()]);

    // Revealing returns exactly the value that went in.
    let revealed = orchestrator.decrypt_record(&record.id).await.unwrap();
    assert_eq!(revealed, 5000);

    let reloaded = orchestrator.records().await;
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded[0].is_verified());
    assert_eq!(reloaded[0].clear_value(), Some(5000));
}

#[tokio::test]
async fn test_failed_submission_leaves_no_partial_state() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    ledger.inject_create_failure(InjectedFailure::Fail).await;

    let err = orchestrator
        .create_record(draft("Jane Doe", 5000, 2020))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SubmissionFailed(_)));

    // Encryption happened, but the failed write left nothing behind.
    assert_eq!(backend.encrypt_calls(), 1);
    assert!(ledger.list_record_ids().await.unwrap().is_empty());
    assert!(orchestrator.records().await.is_empty());
}

#[tokio::test]
async fn test_rejected_signature_is_distinguished() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    ledger.inject_create_failure(InjectedFailure::Reject).await;

    let err = orchestrator
        .create_record(draft("Jane Doe", 5000, 2020))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SubmissionRejected(_)));
}

#[tokio::test]
async fn test_create_requires_signer() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = read_only_client(&ledger, &backend).await;

    let err = orchestrator
        .create_record(draft("Jane Doe", 5000, 2020))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotReady(_)));
    assert_eq!(backend.encrypt_calls(), 0);
}

#[tokio::test]
async fn test_already_verified_short_circuit_makes_no_calls() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    let record = orchestrator
        .create_record(draft("Jane Doe", 5000, 2020))
        .await
        .unwrap();
    let first = orchestrator.decrypt_record(&record.id).await.unwrap();
    assert_eq!(first, 5000);

    let decrypt_calls = backend.decrypt_calls();
    let proof_calls = ledger.proof_calls();

    // Second reveal short-circuits on ledger truth: same value, zero new
    // gateway decryptions, zero new proof submissions.
    let second = orchestrator.decrypt_record(&record.id).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(backend.decrypt_calls(), decrypt_calls);
    assert_eq!(ledger.proof_calls(), proof_calls);
}

#[tokio::test]
async fn test_decrypt_unknown_record_fails() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    let err = orchestrator
        .decrypt_record(&RecordId::from("grant-missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_flows_end_in_one_terminal_status() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    let record = orchestrator
        .create_record(draft("Jane Doe", 5000, 2020))
        .await
        .unwrap();
    let notice = orchestrator.status().current().expect("terminal notice");
    assert_eq!(notice.flow, FlowKind::Create);
    assert_eq!(notice.phase, FlowPhase::Success);

    orchestrator.decrypt_record(&record.id).await.unwrap();
    let notice = orchestrator.status().current().expect("terminal notice");
    assert_eq!(notice.flow, FlowKind::Decrypt);
    assert_eq!(notice.phase, FlowPhase::Success);

    ledger.inject_create_failure(InjectedFailure::Fail).await;
    let _ = orchestrator.create_record(draft("Other", 1, 2021)).await;
    let notice = orchestrator.status().current().expect("terminal notice");
    assert_eq!(notice.flow, FlowKind::Create);
    assert_eq!(notice.phase, FlowPhase::Error);
}

#[tokio::test]
async fn test_availability_check_reports_success() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    assert!(orchestrator.check_availability().await.unwrap());
    let notice = orchestrator.status().current().expect("terminal notice");
    assert_eq!(notice.flow, FlowKind::Availability);
    assert_eq!(notice.phase, FlowPhase::Success);
}

#[tokio::test]
async fn test_empty_ledger_loads_empty_list() {
    let ledger = InMemoryLedger::new(SIGNER_A);
    let backend = LocalBackend::new();
    let orchestrator = client(&ledger, &backend, SIGNER_A).await;

    let records = orchestrator.load_records().await.unwrap();
    assert!(records.is_empty());
}
