//! Config Validation Tests
//!
//! Exercise session config loading and validation from TOML files, and check
//! that a loaded config is what a session actually runs with.

use std::io::Write;
use std::sync::Arc;

use location_analytics::config::defaults::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INTERVAL_MS, DEFAULT_RETRY_DELAY_MS,
};
use location_analytics::{session, AlwaysGranted, ChannelFixSource, ConfigError, HttpTransport, SessionConfig};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn validation_errors(err: ConfigError) -> Vec<String> {
    match err {
        ConfigError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other}"),
    }
}

// ============================================================================
// File loading
// ============================================================================

#[test]
fn minimal_file_takes_defaults() {
    let file = write_config(
        r#"
server_url = "https://analytics.example.com/"
api_key = "k-123"
"#,
    );

    let config = SessionConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.server_url, "https://analytics.example.com/");
    assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
    assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
    assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    assert!(config.subject_id.is_none());
    assert!(!config.device_info.is_empty());
}

#[test]
fn full_file_overrides_every_field() {
    let file = write_config(
        r#"
server_url = "http://10.0.0.5:8080"
api_key = "k-456"
interval_ms = 60000
retry_delay_ms = 5000
http_timeout_secs = 10
device_info = "Pixel 8 / Android 15"
subject_id = "u1"
"#,
    );

    let config = SessionConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.interval_ms, 60_000);
    assert_eq!(config.retry_delay().as_millis(), 5_000);
    assert_eq!(config.http_timeout().as_secs(), 10);
    assert_eq!(config.device_info, "Pixel 8 / Android 15");
    assert_eq!(config.subject_id.as_deref(), Some("u1"));

    let tracking = config.tracking_config();
    assert_eq!(tracking.interval_millis(), 60_000);
    assert_eq!(tracking.fastest_interval_millis(), 30_000);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SessionConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn missing_api_key_is_parse_error() {
    let file = write_config(r#"server_url = "https://analytics.example.com""#);
    let err = SessionConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn blank_credentials_and_bad_interval_are_all_reported() {
    let file = write_config(
        r#"
server_url = "  "
api_key = ""
interval_ms = -5
http_timeout_secs = 0
"#,
    );

    let errors = validation_errors(SessionConfig::load_from_file(file.path()).unwrap_err());
    assert_eq!(errors.len(), 4, "got: {errors:?}");
    assert!(errors.iter().any(|e| e.starts_with("server_url")));
    assert!(errors.iter().any(|e| e.starts_with("api_key")));
    assert!(errors.iter().any(|e| e.contains("-5")));
    assert!(errors.iter().any(|e| e.starts_with("http_timeout_secs")));
}

#[test]
fn non_http_scheme_is_rejected() {
    let file = write_config(
        r#"
server_url = "ftp://analytics.example.com"
api_key = "k"
"#,
    );

    let errors = validation_errors(SessionConfig::load_from_file(file.path()).unwrap_err());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ftp://analytics.example.com"));
}

#[test]
fn validation_message_lists_each_problem() {
    let err = SessionConfig::new("", "").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Config validation failed:"));
    assert!(message.contains("  - server_url: must be set"));
    assert!(message.contains("  - api_key: must be set"));
}

// ============================================================================
// Loaded config drives a session
// ============================================================================

#[tokio::test]
async fn session_runs_with_loaded_interval_and_subject() {
    let file = write_config(
        r#"
server_url = "http://127.0.0.1:9"
api_key = "k"
interval_ms = 120000
subject_id = " rider-7 "
"#,
    );
    let config = SessionConfig::load_from_file(file.path()).unwrap();

    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let (source, feeder) = ChannelFixSource::new();
    let handle = session::spawn(&config, transport, Box::new(source), Arc::new(AlwaysGranted));

    assert_eq!(handle.subject_id().as_deref(), Some("rider-7"));
    handle.start().await.unwrap();

    let request = feeder.active_request().unwrap();
    assert_eq!(request.interval_millis, 120_000);
    assert_eq!(request.fastest_interval_millis, 60_000);

    let status = handle.status().await.unwrap();
    assert_eq!(status.config, config.tracking_config());

    handle.shutdown().await;
}
