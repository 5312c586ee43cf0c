use thiserror::Error;

use payguard_backend::BackendError;
use payguard_store::StoreError;
use payguard_types::IntentStatus;

/// Coarse error classes a caller branches on, independent of the concrete
/// variant that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself is malformed or violates an invariant
    InvalidRequest,
    NotFound,
    /// A guard policy blocked the payment
    GuardBlocked,
    /// The execution backend failed or rejected the call
    BackendFailure,
    Internal,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid payment request: {reason}")]
    Validation { reason: String },

    #[error("payment intent not found: {intent_id}")]
    NotFound { intent_id: String },

    #[error("payment blocked by guard policies: {}", failed.join(", "))]
    PolicyBlocked {
        intent_id: String,
        /// Names of the policies that failed, in evaluation order
        failed: Vec<String>,
    },

    #[error("custody violation: {reason}")]
    CustodyViolation { reason: String },

    #[error("cannot {action} intent {intent_id} in status {from}")]
    InvalidTransition {
        intent_id: String,
        from: IntentStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Validation { .. }
            | EngineError::CustodyViolation { .. }
            | EngineError::InvalidTransition { .. } => ErrorCategory::InvalidRequest,
            EngineError::NotFound { .. } => ErrorCategory::NotFound,
            EngineError::PolicyBlocked { .. } => ErrorCategory::GuardBlocked,
            EngineError::Backend(_) => ErrorCategory::BackendFailure,
            EngineError::Persistence(_) => ErrorCategory::Internal,
        }
    }
}
