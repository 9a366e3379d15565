//! Error types for registry infrastructure and flows.

use thiserror::Error;

use crate::domain::RecordId;

/// Errors that can occur while driving the encrypted-value lifecycle.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Preconditions unmet: no signing identity or encryption context.
    #[error("not ready: {0}")]
    NotReady(String),

    /// The encryption context has not completed initialization.
    #[error("encryption context not initialized")]
    EncryptionUnavailable,

    /// Cryptographic-layer failure during encrypt or proof preparation.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The signing identity declined the transaction.
    #[error("submission rejected by signer: {0}")]
    SubmissionRejected(String),

    /// Ledger-level rejection of a write.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// The ledger already considers the record revealed. Benign: callers
    /// on the reveal path treat this as success after a reload.
    #[error("record already verified on ledger: {0}")]
    AlreadyVerified(RecordId),

    /// The ledger did not finalize the transaction in time.
    #[error("transaction timed out after {seconds}s")]
    TransactionTimeout { seconds: u64 },

    /// The ledger finalized the transaction as reverted.
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    /// Read-path failure while (re)loading the record collection.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// Another operation of the same class is still in flight.
    #[error("{0} operation already in progress")]
    OperationInFlight(&'static str),

    /// No record with this id on the ledger.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// True for the benign race on the reveal path: some other party
    /// verified the record first. Recovered locally, never surfaced as an
    /// error.
    pub fn is_benign_reveal(&self) -> bool {
        matches!(self, RegistryError::AlreadyVerified(_))
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_verified_is_benign() {
        let err = RegistryError::AlreadyVerified(RecordId::from("grant-1"));
        assert!(err.is_benign_reveal());
        assert!(!RegistryError::SubmissionFailed("boom".into()).is_benign_reveal());
    }

    #[test]
    fn test_error_messages_carry_cause() {
        let err = RegistryError::SubmissionFailed("out of gas".into());
        assert!(err.to_string().contains("out of gas"));

        let err = RegistryError::TransactionTimeout { seconds: 90 };
        assert!(err.to_string().contains("90"));
    }
}
