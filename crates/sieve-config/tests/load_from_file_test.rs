//! File-based configuration loading tests

use sieve_config::{ConfigError, ConfigLoader, StorageConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}

#[test]
fn test_load_toml_file() {
    let file = write_temp(
        ".toml",
        r#"
        [query]
        case_sensitive_text = true
        default_page_size = 50
        max_page_size = 500

        [storage]
        path = ":memory:"
        wal_mode = false

        [logging]
        filter = "sieve_query=trace"
        "#,
    );

    let config = ConfigLoader::load_from_file(file.path()).unwrap();

    assert!(config.query.case_sensitive_text);
    assert_eq!(config.query.default_page_size, 50);
    assert_eq!(config.query.max_page_size, 500);
    assert!(config.storage.is_memory());
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, StorageConfig::default().busy_timeout_ms);
    assert_eq!(config.logging.filter, "sieve_query=trace");
}

#[test]
fn test_load_json_file() {
    let file = write_temp(".json", r#"{"query": {"max_page_size": 42, "default_page_size": 7}}"#);

    let config = ConfigLoader::load_from_file(file.path()).unwrap();

    assert_eq!(config.query.max_page_size, 42);
    assert_eq!(config.query.default_page_size, 7);
}

#[test]
fn test_unsupported_extension() {
    let file = write_temp(".yaml", "query: {}");

    let result = ConfigLoader::load_from_file(file.path());

    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
}

#[test]
fn test_missing_file() {
    let result = ConfigLoader::load_from_file("/nonexistent/sieve.toml");
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn test_malformed_toml() {
    let file = write_temp(".toml", "[query\ncase_sensitive_text = ");
    let result = ConfigLoader::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Toml(_))));
}
