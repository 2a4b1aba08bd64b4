// Unit tests for config load/save/validate.

use crate::config::{IpcSettings, PresenceConfig};
use crate::error::config::ConfigError;

use std::time::Duration;

use tempfile::tempdir;

/// **VALUE**: Verifies that a missing config file yields defaults.
///
/// **WHY THIS MATTERS**: First launch has no config; it must not be an error.
///
/// **BUG THIS CATCHES**: Would catch if `load` errors on a missing file.
#[test]
fn given_missing_file_when_loading_then_returns_defaults() {
    // GIVEN: An empty directory
    let dir = tempdir().expect("tempdir");

    // WHEN: Loading
    let config = PresenceConfig::load(dir.path()).expect("defaults");

    // THEN: Defaults, including the bounded response timeout
    assert_eq!(config, PresenceConfig::default());
    assert_eq!(config.ipc_settings().response_timeout, Duration::from_secs(5));
}

/// **VALUE**: Verifies that a saved config loads back unchanged and leaves no temp file.
///
/// **WHY THIS MATTERS**: The atomic write is temp file + rename; a leftover temp file
/// means the rename failed silently.
///
/// **BUG THIS CATCHES**: Would catch a broken rename or fields lost in serialization.
#[test]
fn given_saved_config_when_loading_then_values_survive() {
    // GIVEN: A customized config saved to disk
    let dir = tempdir().expect("tempdir");
    let mut config = PresenceConfig::default();
    config.presence.client_id = Some(String::from("123456789"));
    config.ipc.response_timeout_ms = 750;
    config.ipc.base_dir = Some(dir.path().join("runtime"));
    config.save(dir.path()).expect("save");

    // WHEN: Loading
    let loaded = PresenceConfig::load(dir.path()).expect("load");

    // THEN: Identical, no temp file
    assert_eq!(loaded, config);
    assert!(!dir.path().join("config.json.tmp").exists());
    assert_eq!(
        IpcSettings::from(&loaded.ipc).response_timeout,
        Duration::from_millis(750)
    );
}

/// **VALUE**: Verifies that a partial file fills the rest from defaults.
///
/// **WHY THIS MATTERS**: Users hand-edit config files with only the keys they care about.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` on a section or field.
#[test]
fn given_partial_file_when_loading_then_missing_fields_default() {
    // GIVEN: Only the client id
    let dir = tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"presence": {"client_id": "42"}, "ipc": {"connect_timeout_ms": 100}}"#,
    )
    .expect("write");

    // WHEN: Loading
    let config = PresenceConfig::load(dir.path()).expect("load");

    // THEN: Given values kept, others default
    assert_eq!(config.presence.client_id.as_deref(), Some("42"));
    assert_eq!(config.ipc.connect_timeout_ms, 100);
    assert_eq!(config.ipc.response_timeout_ms, 5_000);
    assert_eq!(config.version, 1);
}

/// **VALUE**: Verifies that corrupt JSON is reported, not replaced by defaults.
///
/// **WHY THIS MATTERS**: Silently discarding a broken file would lose the user's settings
/// on the next save.
///
/// **BUG THIS CATCHES**: Would catch a parse failure being swallowed.
#[test]
fn given_corrupt_file_when_loading_then_returns_parse_error() {
    // GIVEN: Garbage
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("config.json"), "{not json").expect("write");

    // WHEN: Loading
    let result = PresenceConfig::load(dir.path());

    // THEN: ParseError
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies that zero timeouts and blank client ids are rejected.
///
/// **WHY THIS MATTERS**: A zero response timeout fails every request instantly; a blank
/// client id is always refused by the companion.
///
/// **BUG THIS CATCHES**: Would catch missing validation rules.
#[test]
fn given_invalid_values_when_validating_then_names_the_field() {
    let mut zero_timeout = PresenceConfig::default();
    zero_timeout.ipc.response_timeout_ms = 0;

    let mut blank_client = PresenceConfig::default();
    blank_client.presence.client_id = Some(String::from("  "));

    let mut future_version = PresenceConfig::default();
    future_version.version = 99;

    for (config, expected) in [
        (zero_timeout, "ipc.response_timeout_ms"),
        (blank_client, "presence.client_id"),
        (future_version, "version"),
    ] {
        match config.validate() {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, expected),
            other => panic!("Expected validation error for {expected}, got {other:?}"),
        }
    }
}
