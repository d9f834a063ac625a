//! Config loading helpers (file + overrides + env).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{LogfitConfig, LogfitEnv, ValidatedConfig, apply_env_overrides};
use logfit_domain::{Level, LengthUnit, SubstitutionOrder};
use logfit_shared::{ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::Path;

/// Config file formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.json` (also the default when the path has no extension).
    Json,
    /// `.toml`.
    Toml,
}

/// Load the config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`LogfitEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`LogfitConfig::default()`)
pub fn load_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &LogfitEnv,
) -> Result<ValidatedConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => LogfitConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the config from an optional file path.
pub fn load_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &LogfitEnv,
) -> Result<ValidatedConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => LogfitConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the config from std env and an optional file path.
pub fn load_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedConfig, ErrorEnvelope> {
    let env = LogfitEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &LogfitConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &LogfitConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Pick the file format from the path extension.
pub fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<LogfitConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<ConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ConfigOverrides {
    version: Option<u32>,
    dump: DumpOverrides,
    handler: HandlerOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct DumpOverrides {
    max_dump_depth: Option<usize>,
    max_record_length: Option<usize>,
    placeholder: Option<String>,
    depth_marker: Option<String>,
    too_big_fallback: Option<String>,
    length_unit: Option<LengthUnit>,
    max_reduction_steps: Option<usize>,
    substitution_order: Option<SubstitutionOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct HandlerOverrides {
    ignore_record_level_below: Option<Level>,
    stop_when_level_above: Option<Level>,
    pass_channels: Option<Vec<String>>,
    skip_client_errors: Option<bool>,
    deduplicate: Option<bool>,
    error_chain_max_depth: Option<u32>,
    app_env: Option<String>,
    request_id: Option<String>,
    request_id_forwarded: Option<String>,
}

fn apply_overrides(config: &mut LogfitConfig, overrides: ConfigOverrides) {
    set(&mut config.version, overrides.version);

    let dump = overrides.dump;
    set(&mut config.dump.max_dump_depth, dump.max_dump_depth);
    set(&mut config.dump.max_record_length, dump.max_record_length);
    set(&mut config.dump.placeholder, dump.placeholder);
    set(&mut config.dump.depth_marker, dump.depth_marker);
    set(&mut config.dump.too_big_fallback, dump.too_big_fallback);
    set(&mut config.dump.length_unit, dump.length_unit);
    set(&mut config.dump.max_reduction_steps, dump.max_reduction_steps);
    set(&mut config.dump.substitution_order, dump.substitution_order);

    let handler = overrides.handler;
    set(
        &mut config.handler.ignore_record_level_below,
        handler.ignore_record_level_below,
    );
    set(
        &mut config.handler.stop_when_level_above,
        handler.stop_when_level_above,
    );
    set(&mut config.handler.pass_channels, handler.pass_channels);
    set(&mut config.handler.skip_client_errors, handler.skip_client_errors);
    set(&mut config.handler.deduplicate, handler.deduplicate);
    set(
        &mut config.handler.error_chain_max_depth,
        handler.error_chain_max_depth,
    );
    if handler.app_env.is_some() {
        config.handler.app_env = handler.app_env;
    }
    if handler.request_id.is_some() {
        config.handler.request_id = handler.request_id;
    }
    if handler.request_id_forwarded.is_some() {
        config.handler.request_id_forwarded = handler.request_id_forwarded;
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}
