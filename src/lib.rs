//! Sealed Registry Library
//!
//! Confidential donation registry client: records carry a public profile
//! and an encrypted amount that stays sealed on the ledger until its owner
//! reveals it through a verifiable decryption proof.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (records, status notices, projections)
//! - [`infra`] - Infrastructure (errors, trait seams, retry, in-memory ledger)
//! - [`ledger`] - EVM ledger backend
//! - [`gateway`] - Encryption gateway and local backend
//! - [`orchestrator`] - Encrypted-value lifecycle orchestration
//! - [`api`] - REST presentation boundary
//! - [`server`] - HTTP server bootstrap

pub mod api;
pub mod domain;
pub mod gateway;
pub mod infra;
pub mod ledger;
pub mod orchestrator;
pub mod server;

// Re-export commonly used types
pub use domain::{
    CiphertextHandle, FlowKind, FlowPhase, Record, RecordDraft, RecordFilter, RecordId,
    RegistryStats, SealedValue, StatusChannel, StatusNotice,
};

pub use gateway::{EncryptionGateway, LocalBackend};

pub use infra::{
    CreateRecordTx, EncryptedInput, EncryptionBackend, InMemoryLedger, LedgerRead, LedgerWrite,
    PendingTransaction, ProofBundle, RegistryError, Result, TxReceipt,
};

pub use orchestrator::RecordOrchestrator;
