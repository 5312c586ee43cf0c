//! Configuration structures for the engine and its collaborators

use serde::{Deserialize, Serialize};

use payguard_types::GuardPolicy;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub approval: ApprovalSettings,

    /// Guard policies, evaluated in the order they appear here
    #[serde(default)]
    pub policies: Vec<GuardPolicy>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Execution backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the execution backend
    #[serde(default)]
    pub endpoint: String,

    /// Bearer credential attached to every call
    #[serde(default)]
    pub bearer_token: String,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bearer_token: String::new(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Approval behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalSettings {
    /// Force a human approval for every payment, overriding any
    /// auto-approve threshold policy
    #[serde(default)]
    pub require_manual: bool,

    /// Check the wallet balance before creating an intent
    #[serde(default = "default_true")]
    pub balance_precheck: bool,

    /// Execute sub-threshold payments directly, recording them only
    /// after completion
    #[serde(default = "default_true")]
    pub fast_path: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            require_manual: false,
            balance_precheck: true,
            fast_path: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.backend.timeout_ms, 30_000);
        assert_eq!(config.backend.max_retries, 3);
        assert!(!config.approval.require_manual);
        assert!(config.approval.balance_precheck);
        assert!(config.approval.fast_path);
        assert_eq!(config.logging.level, "info");
        assert!(config.policies.is_empty());
    }
}
