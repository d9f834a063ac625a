//! Integration tests for parsing config fixtures.

use logfit_config::{CURRENT_CONFIG_VERSION, parse_config_json, parse_config_toml};
use logfit_domain::{Level, LengthUnit, SubstitutionOrder};
use logfit_shared::ErrorCode;
use std::error::Error;
use std::fs;
use std::path::Path;

fn read_fixture(name: &str) -> Result<String, Box<dyn Error>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    Ok(fs::read_to_string(path)?)
}

#[test]
fn parses_valid_json_fixture_and_normalizes() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("logfit.valid.json")?;
    let config = parse_config_json(&contents)?;

    assert_eq!(config.version, CURRENT_CONFIG_VERSION);
    assert_eq!(config.dump.max_dump_depth, 4);
    assert_eq!(config.dump.length_unit, LengthUnit::Bytes);
    assert_eq!(config.dump.substitution_order, SubstitutionOrder::Forward);
    assert_eq!(config.handler.ignore_record_level_below, Level::Info);
    assert_eq!(config.handler.stop_when_level_above, Level::Alert);
    assert_eq!(config.handler.pass_channels, vec!["app", "security"]);
    assert_eq!(config.handler.app_env.as_deref(), Some("staging"));

    let policy = config.reduction_policy();
    assert_eq!(policy.max_record_length, 8192);
    assert_eq!(policy.placeholder, "too big");
    Ok(())
}

#[test]
fn parses_valid_toml_fixture() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("logfit.valid.toml")?;
    let config = parse_config_toml(&contents)?;

    assert_eq!(config.limits().max_dump_depth.get(), 6);
    assert_eq!(config.limits().error_chain_max_depth.get(), 8);
    assert_eq!(config.dump.depth_marker, "**DEEP**");
    assert_eq!(config.dump.length_unit, LengthUnit::Graphemes);
    assert_eq!(config.handler.ignore_record_level_below, Level::Notice);
    assert!(!config.handler.deduplicate);
    Ok(())
}

#[test]
fn rejects_budget_below_minimal_record() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("logfit.invalid-budget.json")?;
    let error = parse_config_json(&contents).err();

    let envelope = error.ok_or("expected invalid budget to fail")?;
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_limit"));
    assert_eq!(
        envelope.metadata.get("field").map(String::as_str),
        Some("maxRecordLength")
    );
    assert_eq!(envelope.metadata.get("value").map(String::as_str), Some("10"));
    Ok(())
}

#[test]
fn rejects_unknown_toml_fields() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("logfit.unknown-field.toml")?;
    let error = parse_config_toml(&contents).err();

    let envelope = error.ok_or("expected unknown field to fail")?;
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_toml"));
    Ok(())
}

#[test]
fn rejects_unsupported_version() {
    let error = parse_config_json(r#"{"version":2}"#).err();
    assert_eq!(
        error.map(|envelope| envelope.code),
        Some(ErrorCode::new("config", "unsupported_version"))
    );
}
