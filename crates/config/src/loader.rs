//! Configuration loading from multiple sources

use std::path::Path;

use config::{Config, Environment, File, FileFormat};

use crate::{ConfigError, EngineConfig, Result};

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<EngineConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<EngineConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<EngineConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<EngineConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables
    ///
    /// Uses default prefix "PAYGUARD"
    pub fn from_env() -> Result<EngineConfig> {
        Self::from_env_with_prefix("PAYGUARD")
    }

    /// Load configuration from environment variables with custom prefix
    ///
    /// Environment variables should be in the format: PREFIX_SECTION_KEY
    /// For example: PAYGUARD_BACKEND_ENDPOINT=https://pay.example.com
    pub fn from_env_with_prefix(prefix: &str) -> Result<EngineConfig> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Load configuration from file with environment variable overrides.
    /// Environment values win key by key; file values not overridden stay.
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<EngineConfig> {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        let config = Config::builder()
            .add_source(File::from(path).format(format))
            .add_source(Environment::with_prefix(env_prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }
}
