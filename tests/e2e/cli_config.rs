//! CLI config and info E2E tests.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_path(name: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join("config")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn logfit() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_logfit"));
    for (key, _) in std::env::vars() {
        if key.starts_with("EH_") {
            command.env_remove(key);
        }
    }
    command.env_remove("APP_ENV");
    command
}

#[test]
fn config_check_accepts_valid_fixtures() -> io::Result<()> {
    for name in ["logfit.valid.json", "logfit.valid.toml"] {
        let output = logfit()
            .args(["--json", "config", "check", "--path"])
            .arg(fixture_path(name))
            .output()?;
        assert!(output.status.success(), "{name} must pass");

        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
        assert_eq!(value["status"], "ok");
    }
    Ok(())
}

#[test]
fn config_check_rejects_invalid_fixtures() -> io::Result<()> {
    for (name, code) in [
        ("logfit.invalid-budget.json", "config:invalid_limit"),
        ("logfit.unknown-field.toml", "config:invalid_toml"),
    ] {
        let output = logfit()
            .args(["config", "check", "--path"])
            .arg(fixture_path(name))
            .output()?;
        assert_eq!(output.status.code(), Some(2), "{name} must fail");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(&format!("code: {code}\n")), "{name}: {stdout}");
    }
    Ok(())
}

#[test]
fn config_show_reflects_env_overrides() -> io::Result<()> {
    let output = logfit()
        .args(["--json", "config", "show"])
        .env("EH_MAX_DUMP_LEVEL", "2")
        .env("APP_ENV", "prod")
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(value["effectiveConfig"]["dump"]["maxDumpDepth"], 2);
    assert_eq!(value["effectiveConfig"]["handler"]["appEnv"], "prod");
    Ok(())
}

#[test]
fn invalid_env_values_are_reported() -> io::Result<()> {
    let output = logfit()
        .args(["config", "check"])
        .env("EH_STOP_WHEN_RECORD_LEVEL_ABOVE", "LOUD")
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("code: config:invalid_env_level"));
    Ok(())
}

#[test]
fn info_is_deterministic() -> io::Result<()> {
    let first = logfit().args(["--json", "info"]).output()?;
    let second = logfit().args(["--json", "info"]).output()?;
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let value: serde_json::Value =
        serde_json::from_slice(&first.stdout).map_err(io::Error::other)?;
    assert_eq!(value["build"]["name"], "logfit-cli");
    Ok(())
}
