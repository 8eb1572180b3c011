//! ============================================================================
//! Errors - Collaborator failures and controller errors
//! ============================================================================
//! API failures are classified into three kinds. None of them is fatal to the
//! page: the gate always degrades to the locked view.
//! ============================================================================

use thiserror::Error;

/// Failure talking to one of the portal's backend services
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 401: no authenticated session
    #[error("Not authenticated")]
    AuthRequired,

    /// Request never produced a response (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-2xx response
    #[error("Portal API error {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Coarse classification used by the gate to pick a recovery path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fail open to the locked view, no diagnostic
    AuthRequired,
    /// State becomes Unknown, non-blocking diagnostic
    TransientNetwork,
    /// Treated like a transient failure
    MalformedResponse,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::AuthRequired => ErrorKind::AuthRequired,
            ApiError::Network(_) | ApiError::Status { .. } => ErrorKind::TransientNetwork,
            ApiError::Malformed(_) => ErrorKind::MalformedResponse,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::AuthRequired)
    }
}

/// Errors surfaced by the few controller operations that can refuse work
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Access is already unlocked")]
    AlreadyUnlocked,

    #[error("{0}")]
    PaymentRejected(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}
