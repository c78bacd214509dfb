//! CLI integration tests
//!
//! These tests run the compiled binary and verify:
//! - Command parsing and help output
//! - Output formatting
//! - Exit codes for failures that need no server

mod support;

use std::fs;
use std::process::Command;
use support::localgen_binary;
use tempfile::TempDir;

/// Points the binary at a port nothing listens on
fn localgen() -> Command {
    let mut command = Command::new(localgen_binary());
    command
        .env("OLLAMA_HOST", "http://127.0.0.1:9")
        .env("LOCALGEN_REQUEST_TIMEOUT", "2")
        .env("LOCALGEN_MAX_RETRIES", "0")
        .env_remove("LOCALGEN_MODEL")
        .env_remove("LOCALGEN_LOG_LEVEL")
        .env_remove("RUST_LOG");
    command
}

#[test]
fn test_cli_help() {
    let output = localgen()
        .arg("--help")
        .output()
        .expect("Failed to execute localgen");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("models"));
    assert!(stdout.contains("health"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_cli_version() {
    let output = localgen()
        .arg("--version")
        .output()
        .expect("Failed to execute localgen");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_json() {
    let output = localgen()
        .args(["config", "--format", "json"])
        .output()
        .expect("Failed to execute localgen");

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config output should be JSON");
    assert_eq!(parsed["host"], "http://127.0.0.1:9");
    assert_eq!(parsed["default_model"], "llama2");
    assert_eq!(parsed["max_retries"], "0");
}

#[test]
fn test_config_human() {
    let output = localgen()
        .arg("config")
        .output()
        .expect("Failed to execute localgen");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Host: http://127.0.0.1:9"));
    assert!(stdout.contains("Default Model: llama2"));
}

#[test]
fn test_generate_rejects_empty_prompt() {
    let output = localgen()
        .args(["generate", ""])
        .output()
        .expect("Failed to execute localgen");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VALIDATION_FAILED"));
}

#[test]
fn test_generate_rejects_out_of_range_temperature() {
    let output = localgen()
        .args(["generate", "--temperature", "3.5", "Hello"])
        .output()
        .expect("Failed to execute localgen");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("temperature"));
}

#[test]
fn test_health_reports_unreachable_server() {
    let output = localgen()
        .args(["health", "--format", "json"])
        .output()
        .expect("Failed to execute localgen");

    assert_eq!(output.status.code(), Some(1));
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("health output should be JSON");
    assert_eq!(parsed["available"], false);
}

#[test]
fn test_configure_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.yaml");
    fs::write(&path, "parameters:\n  contextLength: 64\n").unwrap();

    let output = localgen()
        .args(["models", "configure", "llama2", "--config"])
        .arg(&path)
        .output()
        .expect("Failed to execute localgen");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VALIDATION_FAILED"));
}

#[test]
fn test_invalid_format_rejected() {
    let output = localgen()
        .args(["config", "--format", "xml"])
        .output()
        .expect("Failed to execute localgen");

    assert!(!output.status.success());
}
