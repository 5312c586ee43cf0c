use thiserror::Error;

/// Failures from the execution backend client.
///
/// Only the network-class variants are retried; everything else, including
/// an error envelope inside a 200 response, propagates immediately.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("network error calling backend: {message}")]
    Network { message: String },

    #[error("backend reported failure: {message}")]
    Application { message: String },

    #[error("malformed backend response: {message}")]
    Protocol { message: String },

    #[error("backend client misconfigured: {message}")]
    Config { message: String },
}

impl BackendError {
    /// The fixed allow-list of retryable conditions: timeouts and
    /// connection-class failures. Application and protocol errors are the
    /// backend speaking; repeating the question will not change the answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout { .. } | BackendError::Network { .. }
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            BackendError::Timeout { timeout_ms }
        } else if err.is_connect() || err.is_request() || err.is_body() {
            // Connection refused/reset, socket errors, interrupted bodies
            BackendError::Network {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            BackendError::Protocol {
                message: err.to_string(),
            }
        } else {
            BackendError::Network {
                message: err.to_string(),
            }
        }
    }
}
