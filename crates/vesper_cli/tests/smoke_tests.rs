//! CLI smoke tests: drive the binary against a temp workspace.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cli_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vesper"));
    // Keep the developer's environment out of the run
    for var in [
        "LLM_PROVIDER",
        "LLM_MODEL",
        "ONEBOT_WS_URL",
        "VESPER_GROUP_ID",
        "VESPER_TIMEZONE",
        "VESPER_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("vesper.toml");
    let body = format!(
        "[llm]\nprovider = \"mock\"\nmodel = \"smoke\"\n\n[storage]\ndb_path = {:?}\nmood_path = {:?}\n{}",
        dir.join("content.db"),
        dir.join("mood.json"),
        extra
    );
    std::fs::write(&path, body).unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    cli_bin()
        .arg("--config")
        .arg(config)
        .args(args)
        .current_dir(config.parent().unwrap())
        .output()
        .expect("failed to run")
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("pick"));
    assert!(stdout.contains("seed"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("vesper"), "Expected binary name in --version output");
}

#[test]
fn test_seed_then_pick_then_generate() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let seeded = run(&config, &["seed", "Devotion", "You showed up today."]);
    assert!(seeded.status.success(), "{}", String::from_utf8_lossy(&seeded.stderr));

    let first = run(&config, &["pick", "devotion"]);
    assert!(first.status.success());
    assert_eq!(String::from_utf8_lossy(&first.stdout).trim(), "You showed up today.");

    // Category exhausted: the mock model writes a new one
    let second = run(&config, &["pick", "Devotion"]);
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("Mock smoke Response"));
}

#[test]
fn test_status_prints_mood_and_counts() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    run(&config, &["seed", "Tech Tips", "use rg"]);

    let output = run(&config, &["status"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"mode\": \"default\""));
    assert!(stdout.contains("Tech Tips: 1 items, 1 unused"));
}

#[test]
fn test_seed_rejects_empty_text() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let output = run(&config, &["seed", "Devotion", "   "]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_rule_fails_at_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "\n[[schedule.rules]]\nname = \"broken\"\ncategory = \"Devotion\"\nrecurrence = { kind = \"daily\", hour = 25, minute = 0 }\n",
    );
    let output = run(&config, &["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken"));
}

#[test]
fn test_malformed_config_fails_at_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("vesper.toml");
    std::fs::write(&config, "[llm\nprovider = \"mock\"\n").unwrap();
    let output = run(&config, &["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse TOML config"));
}

#[test]
fn test_zero_tick_interval_fails_at_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(dir.path(), "\n[schedule]\ntick_interval_secs = 0\n");
    let output = run(&config, &["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("tick_interval_secs"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin()
        .arg("--config")
        .arg(dir.path().join("nonexistent.toml"))
        .arg("status")
        .current_dir(dir.path())
        .output()
        .expect("failed to run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}
