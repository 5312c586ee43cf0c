use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backoff::ExponentialBackoff;
use crate::error::BackendError;

/// Configuration for [`BackendClient`].
pub struct BackendConfig {
    /// Backend base URL (without trailing slash)
    pub endpoint: String,
    /// Bearer credential attached to every call
    pub bearer_token: String,
    /// Per-call timeout; a timed-out call counts as transient
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Optional pre-configured reqwest client
    pub http_client: Option<reqwest::Client>,
}

impl BackendConfig {
    pub fn new(endpoint: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: bearer_token.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            http_client: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Wire format of a backend call.
#[derive(Debug, Serialize)]
struct CallEnvelope<'a> {
    method: &'a str,
    params: &'a Value,
}

/// Request/response client for the execution backend.
///
/// Each `call` is at most `max_retries + 1` attempts; retries are
/// sequential with exponential backoff and happen only for the transient
/// allow-list (timeout, connection-class network failures).
pub struct BackendClient {
    endpoint: String,
    bearer_token: String,
    timeout: Duration,
    max_retries: u32,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        if config.endpoint.trim().is_empty() {
            return Err(BackendError::Config {
                message: "backend endpoint is required".to_string(),
            });
        }

        let client = match config.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| BackendError::Config {
                    message: format!("failed to build http client: {e}"),
                })?,
        };

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token,
            timeout: config.timeout,
            max_retries: config.max_retries,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call a backend method, retrying transient failures.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let mut backoff = ExponentialBackoff::default();

        let mut attempt = 0u32;
        loop {
            match self.call_once(method, &params).await {
                Ok(result) => {
                    debug!(method, attempt, "backend call succeeded");
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = backoff.next_delay();
                    warn!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn call_once(&self, method: &str, params: &Value) -> Result<Value, BackendError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let envelope = CallEnvelope { method, params };

        let request = self
            .client
            .post(format!("{}/rpc", self.endpoint))
            .headers(self.headers())
            .json(&envelope)
            .send();

        // Cooperative cancellation: the outer timeout bounds the whole call
        // even if the transport-level timeout misbehaves.
        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(BackendError::from_reqwest(err, timeout_ms)),
            Err(_) => return Err(BackendError::Timeout { timeout_ms }),
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BackendError::from_reqwest(err, timeout_ms))?;

        if !status.is_success() {
            return Err(BackendError::Application {
                message: format!("backend returned {status}: {body}"),
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| BackendError::Protocol {
            message: format!("invalid JSON from backend: {e}"),
        })?;

        validate_envelope(value)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.bearer_token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// A transport-successful response can still carry an application failure,
/// either as a structured error object or as a result payload whose own
/// `status` is `"error"`. Both are failures; neither is retried.
fn validate_envelope(value: Value) -> Result<Value, BackendError> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(BackendError::Application { message });
    }

    let result = value
        .get("result")
        .cloned()
        .ok_or_else(|| BackendError::Protocol {
            message: "response carries neither result nor error".to_string(),
        })?;

    if result.get("status").and_then(Value::as_str) == Some("error") {
        let message = result
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("backend result reported status \"error\"")
            .to_string();
        return Err(BackendError::Application { message });
    }

    Ok(result)
}
