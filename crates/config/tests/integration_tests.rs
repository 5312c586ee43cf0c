use std::io::Write;

use payguard_config::{validate_config, ConfigLoader};

const FULL_CONFIG: &str = r#"
[backend]
endpoint = "https://pay.example.com"
bearer_token = "secret-token"

[approval]
require_manual = false
fast_path = true

[logging]
level = "info"

[[policies]]
id = "g-tx"
name = "Single transaction limit"
kind = "single_transaction_limit"
limit = "100"

[[policies]]
id = "g-budget"
name = "Daily budget"
kind = "rolling_budget_limit"
limit = "500"
window_secs = 86400

[[policies]]
id = "g-auto"
name = "Auto-approve threshold"
kind = "auto_approve_threshold"
limit = "75"
"#;

#[test]
fn loaded_file_config_passes_validation() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(FULL_CONFIG.as_bytes()).unwrap();

    let config = ConfigLoader::from_file(file.path()).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.policies.len(), 3);
    assert_eq!(config.backend.timeout_ms, 30_000);
}

#[test]
fn file_with_env_falls_back_to_file_when_no_overrides_set() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(FULL_CONFIG.as_bytes()).unwrap();

    // Prefix chosen so no ambient variables match
    let config = ConfigLoader::from_file_with_env(file.path(), "PAYGUARD_TEST_NONE").unwrap();
    assert_eq!(config.backend.endpoint, "https://pay.example.com");
    assert_eq!(config.policies.len(), 3);
}

#[test]
fn config_round_trips_through_serialization() {
    let config = ConfigLoader::from_toml(FULL_CONFIG).unwrap();
    let json = serde_json::to_string(&config).unwrap();
    let back = ConfigLoader::from_json(&json).unwrap();
    assert_eq!(back.policies.len(), config.policies.len());
    assert_eq!(back.backend.endpoint, config.backend.endpoint);
}
