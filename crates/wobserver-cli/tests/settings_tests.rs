//! Settings file loading

use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use wobserver_cli::settings::{LogOutput, LogRotation, Settings};

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_values_override_defaults() {
    let file = toml_file(
        r#"
host = "example.com/wobserver"
secure = true
node = "worker@10.0.0.2"
reconnect_delay_secs = 2
max_message_size = 65536

[logging]
level = "debug"
output = "both"
directory = "/tmp/wobserver-logs"
rotation = "daily"
"#,
    );

    let settings = Settings::load_with_prefix(Some(file.path()), "WOBSERVER_SETTINGS_TEST").unwrap();

    assert_eq!(settings.host, "example.com/wobserver");
    assert!(settings.secure);
    assert_eq!(settings.node, "worker@10.0.0.2");
    assert_eq!(settings.reconnect_delay_secs, 2);
    assert_eq!(settings.max_message_size, Some(65536));
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.logging.output, LogOutput::Both);
    assert_eq!(settings.logging.rotation, LogRotation::Daily);

    // Untouched keys keep their defaults
    assert_eq!(settings.keepalive_interval_secs, 15);
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.logging.file_prefix, "wobserver");
}

#[test]
fn test_empty_file_yields_defaults() {
    let file = toml_file("");
    let settings = Settings::load_with_prefix(Some(file.path()), "WOBSERVER_SETTINGS_TEST").unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let file = toml_file("host = [unterminated");
    let err = Settings::load_with_prefix(Some(file.path()), "WOBSERVER_SETTINGS_TEST").unwrap_err();
    assert!(matches!(err, wobserver_cli::CliError::Config(_)));
    assert!(!err.suggestions().is_empty());
}

#[test]
fn test_wrong_type_is_a_config_error() {
    let file = toml_file("keepalive_interval_secs = \"soon\"");
    let result = Settings::load_with_prefix(Some(file.path()), "WOBSERVER_SETTINGS_TEST");
    assert!(result.is_err());
}
