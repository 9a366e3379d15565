//! Structured API error responses with stable error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::RegistryError;

/// Machine-readable error codes for programmatic handling by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Preconditions unmet (no signer / encryption context).
    NotReady,
    /// Encryption context not initialized or cryptographic failure.
    EncryptionError,
    /// Signer declined the transaction.
    SubmissionRejected,
    /// Ledger-level rejection.
    SubmissionFailed,
    /// Transaction timed out waiting for finalization.
    TransactionTimeout,
    /// Transaction finalized as reverted.
    TransactionReverted,
    /// Read-path failure.
    LoadFailed,
    /// Another operation of the same class is in flight.
    OperationInFlight,
    /// Record not found on the ledger.
    RecordNotFound,
    /// Invalid request input.
    InvalidFieldValue,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::EncryptionError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::SubmissionRejected => StatusCode::BAD_REQUEST,
            ErrorCode::SubmissionFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::TransactionTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::TransactionReverted => StatusCode::BAD_GATEWAY,
            ErrorCode::LoadFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::OperationInFlight => StatusCode::CONFLICT,
            ErrorCode::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                message: message.into(),
                resource_id: None,
            },
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotReady(msg) => ApiError::new(ErrorCode::NotReady, msg),
            RegistryError::EncryptionUnavailable => ApiError::new(
                ErrorCode::EncryptionError,
                "encryption context not initialized",
            ),
            RegistryError::EncryptionFailed(msg) => ApiError::new(ErrorCode::EncryptionError, msg),
            RegistryError::SubmissionRejected(msg) => {
                ApiError::new(ErrorCode::SubmissionRejected, msg)
            }
            RegistryError::SubmissionFailed(msg) => ApiError::new(ErrorCode::SubmissionFailed, msg),
            // The benign reveal race never reaches the error path in the
            // orchestrator; if it surfaces here, report it plainly.
            RegistryError::AlreadyVerified(id) => ApiError::new(
                ErrorCode::SubmissionFailed,
                format!("record already verified: {}", id),
            )
            .with_resource_id(id.to_string()),
            RegistryError::TransactionTimeout { seconds } => ApiError::new(
                ErrorCode::TransactionTimeout,
                format!("transaction timed out after {}s", seconds),
            ),
            RegistryError::TransactionReverted(msg) => {
                ApiError::new(ErrorCode::TransactionReverted, msg)
            }
            RegistryError::LoadFailed(msg) => ApiError::new(ErrorCode::LoadFailed, msg),
            RegistryError::OperationInFlight(op) => ApiError::new(
                ErrorCode::OperationInFlight,
                format!("{} operation already in progress", op),
            ),
            RegistryError::RecordNotFound(id) => {
                ApiError::new(ErrorCode::RecordNotFound, format!("record not found: {}", id))
                    .with_resource_id(id.to_string())
            }
            RegistryError::Configuration(msg) => ApiError::new(ErrorCode::InternalError, msg),
            RegistryError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}
