//! Configuration layering tests

use event_assistant::config::Config;
use event_assistant::search::{StoreBackend, TermPolicy};
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_uses_defaults() {
    let config = Config::load_from("/nonexistent/event-assistant.toml").unwrap();

    assert_eq!(config.server.http_port, 8080);
    assert_eq!(config.store.backend, StoreBackend::Cloudant);
    assert_eq!(config.store.url, "http://localhost:5984");
    assert_eq!(config.store.database, "events");
    assert_eq!(config.store.design_document, "_design/search");
    assert_eq!(config.store.term_policy, TermPolicy::Escape);
    assert!(!config.observability.json_logs);
}

#[test]
fn test_file_overrides_defaults() {
    let file = write_config(
        r#"
[server]
http_port = 9090

[store]
backend = "memory"
database = "conference"
username = "reader"
password = "secret"
timeout_secs = 3
retry_backoff_ms = 50
term_policy = "raw"
seed_file = "data/events.json"
"#,
    );

    let config = Config::load_from(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.server.http_port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.database, "conference");
    assert_eq!(config.store.username.as_deref(), Some("reader"));
    assert_eq!(config.store.password.as_deref(), Some("secret"));
    assert_eq!(config.store.timeout(), Duration::from_secs(3));
    assert_eq!(config.store.retry_backoff(), Duration::from_millis(50));
    assert_eq!(config.store.term_policy, TermPolicy::Raw);
    assert_eq!(
        config.store.seed_file.as_deref(),
        Some(std::path::Path::new("data/events.json"))
    );
    // Untouched keys keep their defaults
    assert_eq!(config.store.max_retries, 2);
}

#[test]
fn test_invalid_value_is_rejected() {
    let file = write_config(
        r#"
[store]
term_policy = "loose"
"#,
    );

    assert!(Config::load_from(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
[observability]
log_level = "warn"
"#,
    );

    // Only this test reads the log level, so the variable cannot leak into
    // other assertions in this binary
    std::env::set_var("EVENT_ASSISTANT__OBSERVABILITY__LOG_LEVEL", "debug");
    let config = Config::load_from(file.path().to_str().unwrap());
    std::env::remove_var("EVENT_ASSISTANT__OBSERVABILITY__LOG_LEVEL");

    assert_eq!(config.unwrap().observability.log_level, "debug");
}
