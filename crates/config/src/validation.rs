//! Configuration validation

use std::collections::HashSet;

use rust_decimal::Decimal;

use payguard_types::GuardKind;

use crate::{ConfigError, EngineConfig, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire engine configuration
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.backend.endpoint.is_empty() {
        errors.push(ValidationError::new(
            "backend.endpoint",
            "backend endpoint is required",
        ));
    } else if let Err(e) = validate_url(&config.backend.endpoint) {
        errors.push(ValidationError::new("backend.endpoint", e));
    }

    if config.backend.bearer_token.is_empty() {
        errors.push(ValidationError::new(
            "backend.bearer_token",
            "bearer token is required",
        ));
    }

    if config.backend.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "backend.timeout_ms",
            "must be greater than 0",
        ));
    }

    if let Err(e) = validate_log_level(&config.logging.level) {
        errors.push(e);
    }

    let ids: HashSet<_> = config.policies.iter().map(|p| p.id.as_str()).collect();
    if ids.len() != config.policies.len() {
        errors.push(ValidationError::new(
            "policies",
            "duplicate policy ids found",
        ));
    }

    for policy in &config.policies {
        if policy.id.is_empty() {
            errors.push(ValidationError::new("policies", "policy id is required"));
        }

        if policy.kind != GuardKind::RecipientAllowlist && policy.limit <= Decimal::ZERO {
            errors.push(ValidationError::new(
                format!("policies.{}.limit", policy.id),
                "must be greater than 0",
            ));
        }

        if policy.kind == GuardKind::RecipientAllowlist && policy.allowed.is_empty() {
            // An empty allowlist would block every payment
            errors.push(ValidationError::new(
                format!("policies.{}.allowed", policy.id),
                "allowlist needs at least one recipient address",
            ));
        }
        if policy.kind != GuardKind::RecipientAllowlist && !policy.allowed.is_empty() {
            errors.push(ValidationError::new(
                format!("policies.{}.allowed", policy.id),
                "only recipient-allowlist policies take addresses",
            ));
        }

        match policy.kind {
            GuardKind::RollingBudgetLimit => {
                if policy.window_secs == Some(0) {
                    errors.push(ValidationError::new(
                        format!("policies.{}.window_secs", policy.id),
                        "must be greater than 0",
                    ));
                }
            }
            GuardKind::SingleTransactionLimit
            | GuardKind::RecipientAllowlist
            | GuardKind::AutoApproveThreshold => {
                if policy.window_secs.is_some() {
                    errors.push(ValidationError::new(
                        format!("policies.{}.window_secs", policy.id),
                        "only rolling-budget policies take a window",
                    ));
                }
            }
        }
    }

    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok(())
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "logging.level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
