//! Integration tests for env parsing and env-to-config merging.

use logfit_config::{EnvParseError, LogfitConfig, LogfitEnv, apply_env_overrides};
use logfit_domain::Level;
use logfit_shared::ErrorCode;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::Path;

fn read_env_map(name: &str) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[test]
fn env_fixture_merges_into_effective_config() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env.valid.json")?;
    let env = LogfitEnv::from_map(&env_map)?;

    let config = apply_env_overrides(LogfitConfig::default(), &env)?;

    assert_eq!(config.dump.max_dump_depth, 3);
    assert_eq!(config.dump.max_record_length, 4000);
    assert_eq!(config.handler.ignore_record_level_below, Level::Warning);
    assert_eq!(config.handler.stop_when_level_above, Level::Error);
    assert_eq!(config.handler.app_env.as_deref(), Some("prod"));
    assert_eq!(config.handler.request_id.as_deref(), Some("req-1"));
    assert_eq!(config.handler.request_id_forwarded, None);
    Ok(())
}

#[test]
fn env_overrides_file_values() -> Result<(), Box<dyn Error>> {
    let mut base = LogfitConfig::default();
    base.dump.max_record_length = 9000;
    base.handler.app_env = Some("dev".to_owned());

    let env_map = read_env_map("env.valid.json")?;
    let env = LogfitEnv::from_map(&env_map)?;
    let config = apply_env_overrides(base, &env)?;

    assert_eq!(config.dump.max_record_length, 4000);
    assert_eq!(config.handler.app_env.as_deref(), Some("prod"));
    Ok(())
}

#[test]
fn invalid_level_fixture_fails_with_env_metadata() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env.invalid-level.json")?;
    let error = LogfitEnv::from_map(&env_map).err();

    assert_eq!(
        error,
        Some(EnvParseError::InvalidLevel {
            var: "EH_IGNORE_RECORD_LEVEL_BELOW",
            value: "verbose".to_owned(),
        })
    );

    let envelope = logfit_shared::ErrorEnvelope::from(error.ok_or("expected an env error")?);
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_level"));
    assert_eq!(
        envelope.metadata.get("env_var").map(String::as_str),
        Some("EH_IGNORE_RECORD_LEVEL_BELOW")
    );
    Ok(())
}
