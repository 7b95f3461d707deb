//! Config Loading Tests
//!
//! File-based loading of `walkthrough.toml` and the mapping from config to
//! orchestrator options.

use std::io::Write;
use std::time::Duration;

use safety_walkthrough::config::{AppConfig, ConfigError};
use safety_walkthrough::OrchestratorOptions;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_file_loads() {
    let file = write_config(
        r#"
[backend]
base_url = "https://analysis.example.com"
request_timeout_secs = 30
max_retries = 2
retry_backoff_ms = 250

[animation]
phase_interval_ms = 400
settle_delay_ms = 100
skip = false
"#,
    );

    let config = AppConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.backend.base_url, "https://analysis.example.com");
    assert_eq!(config.backend.timeout(), Duration::from_secs(30));
    assert_eq!(config.backend.retry_backoff(), Duration::from_millis(250));
    assert_eq!(config.backend.max_retries, 2);

    let options = OrchestratorOptions::from_config(&config.animation);
    assert_eq!(options.timing.phase_interval, Duration::from_millis(400));
    assert_eq!(options.timing.settle_delay, Duration::from_millis(100));
    assert!(!options.skip_animation);
}

#[test]
fn test_empty_file_is_all_defaults() {
    let file = write_config("");
    assert_eq!(AppConfig::load_from_file(file.path()).unwrap(), AppConfig::default());
}

#[test]
fn test_skip_flag_reaches_orchestrator_options() {
    let file = write_config("[animation]\nskip = true\n");
    let config = AppConfig::load_from_file(file.path()).unwrap();

    assert!(OrchestratorOptions::from_config(&config.animation).skip_animation);
}

#[test]
fn test_parse_error_names_the_file() {
    let file = write_config("[backend]\nmax_retries = \"three\"\n");

    match AppConfig::load_from_file(file.path()) {
        Err(ConfigError::Parse(path, _)) => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_invalid_values_are_rejected_from_file() {
    let file = write_config("[backend]\nbase_url = \"ftp://analysis\"\n");

    let err = AppConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    assert!(err.to_string().contains("base_url"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("walkthrough.toml");

    assert!(matches!(
        AppConfig::load_from_file(&missing),
        Err(ConfigError::Io(..))
    ));
}

#[test]
fn test_saved_config_loads_back() {
    let mut config = AppConfig::default();
    config.backend.base_url = "http://10.0.0.5:8000".to_string();
    config.animation.skip = true;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walkthrough.toml");
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    assert_eq!(AppConfig::load_from_file(&path).unwrap(), config);
}
