//! Integration tests for the `fz` binary's non-interactive paths.
//!
//! Each test runs the binary with an isolated HOME so no user config leaks in.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn fz_binary() -> String {
    env!("CARGO_BIN_EXE_fz").to_string()
}

fn fz(home: &Path, args: &[&str]) -> Output {
    Command::new(fz_binary())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("FZ_API_KEY")
        .env_remove("FZ_STUDY_MINUTES")
        .args(args)
        .output()
        .expect("failed to run fz")
}

#[test]
fn test_no_subcommand_prints_help() {
    let temp = TempDir::new().unwrap();
    let output = fz(temp.path(), &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: fz"));
    assert!(stdout.contains("study"));
    assert!(stdout.contains("exam"));
}

#[test]
fn test_config_layers_file_and_env() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("fz.toml");
    std::fs::write(&config_path, "study_minutes = 40\n\n[exam]\nshort = 4\n").unwrap();

    let output = Command::new(fz_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("FZ_API_KEY", "sk-ant-integration")
        .env("FZ_ON_EXPIRY", "auto-submit")
        .args(["--config", config_path.to_str().unwrap(), "config"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "fz config should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("study_minutes = 40"));
    assert!(stdout.contains("short = 4"));
    assert!(stdout.contains("on_expiry = \"auto-submit\""));
    assert!(stdout.contains("api_key = \"[redacted]\""));
    assert!(!stdout.contains("sk-ant-integration"));
}

#[test]
fn test_exam_without_api_key_fails_with_hint() {
    let temp = TempDir::new().unwrap();
    let notes = temp.path().join("os.md");
    std::fs::write(&notes, "# Operating Systems\nProcesses and threads.").unwrap();

    let output = fz(temp.path(), &["exam", notes.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FZ_API_KEY"), "unexpected stderr: {stderr}");
}

#[test]
fn test_exam_rejects_empty_configuration() {
    let temp = TempDir::new().unwrap();
    let notes = temp.path().join("os.md");
    std::fs::write(&notes, "Processes and threads.").unwrap();

    let output = fz(
        temp.path(),
        &[
            "exam",
            notes.to_str().unwrap(),
            "--short",
            "0",
            "--medium",
            "0",
            "--long",
            "0",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least one question"), "unexpected stderr: {stderr}");
}

#[test]
fn test_study_reports_missing_material() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.md");

    let output = Command::new(fz_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("FZ_API_KEY", "sk-ant-integration")
        .args(["study", missing.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.md"), "unexpected stderr: {stderr}");
}

#[test]
fn test_zero_study_minutes_from_env_is_rejected() {
    let temp = TempDir::new().unwrap();

    let output = Command::new(fz_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("FZ_STUDY_MINUTES", "0")
        .arg("config")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("study_minutes must be at least 1"),
        "unexpected stderr: {stderr}"
    );
}
