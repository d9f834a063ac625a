//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - compatible (level vars accept names and numeric ordinals)
//! - safe (secret values are redacted in error metadata)

use crate::schema::{LogfitConfig, ValidatedConfig};
use logfit_domain::Level;
use logfit_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: depth ceiling.
pub const ENV_MAX_DUMP_LEVEL: &str = "EH_MAX_DUMP_LEVEL";
/// Env var: output budget.
pub const ENV_MAX_RECORD_LENGTH: &str = "EH_MAX_RECORD_LENGTH";
/// Env var: records below this level are skipped.
pub const ENV_IGNORE_RECORD_LEVEL_BELOW: &str = "EH_IGNORE_RECORD_LEVEL_BELOW";
/// Env var: records above this level request a stop.
pub const ENV_STOP_WHEN_RECORD_LEVEL_ABOVE: &str = "EH_STOP_WHEN_RECORD_LEVEL_ABOVE";
/// Env var: shorter alias of [`ENV_STOP_WHEN_RECORD_LEVEL_ABOVE`].
pub const ENV_STOP_RECORD_LEVEL_ABOVE: &str = "EH_STOP_RECORD_LEVEL_ABOVE";
/// Env var: application environment name.
pub const ENV_APP_ENV: &str = "APP_ENV";
/// Env var: request id.
pub const ENV_REQUEST_ID: &str = "REQUEST_ID";
/// Env var: forwarded request id.
pub const ENV_FORWARDED_REQUEST_ID: &str = "HTTP_X_FORWARDED_REQUEST_ID";
/// Env var: diagnostics filter for the CLI's own logs.
pub const ENV_LOG_FILTER: &str = "LOGFIT_LOG";

const ENV_VARS: [&str; 8] = [
    ENV_MAX_DUMP_LEVEL,
    ENV_MAX_RECORD_LENGTH,
    ENV_IGNORE_RECORD_LEVEL_BELOW,
    ENV_STOP_WHEN_RECORD_LEVEL_ABOVE,
    ENV_STOP_RECORD_LEVEL_ABOVE,
    ENV_APP_ENV,
    ENV_REQUEST_ID,
    ENV_FORWARDED_REQUEST_ID,
];

/// Parsed env overrides. `None` leaves the config value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogfitEnv {
    /// `EH_MAX_DUMP_LEVEL`.
    pub max_dump_depth: Option<usize>,
    /// `EH_MAX_RECORD_LENGTH`.
    pub max_record_length: Option<usize>,
    /// `EH_IGNORE_RECORD_LEVEL_BELOW`.
    pub ignore_record_level_below: Option<Level>,
    /// `EH_STOP_WHEN_RECORD_LEVEL_ABOVE` (or its alias).
    pub stop_when_level_above: Option<Level>,
    /// `APP_ENV`.
    pub app_env: Option<String>,
    /// `REQUEST_ID`.
    pub request_id: Option<String>,
    /// `HTTP_X_FORWARDED_REQUEST_ID`.
    pub request_id_forwarded: Option<String>,
}

impl LogfitEnv {
    /// Parse overrides from an explicit map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            max_dump_depth: parse_optional_usize(map, ENV_MAX_DUMP_LEVEL)?,
            max_record_length: parse_optional_usize(map, ENV_MAX_RECORD_LENGTH)?,
            ignore_record_level_below: parse_optional_level(map, ENV_IGNORE_RECORD_LEVEL_BELOW)?,
            stop_when_level_above: parse_optional_level_any(
                map,
                &[ENV_STOP_WHEN_RECORD_LEVEL_ABOVE, ENV_STOP_RECORD_LEVEL_ABOVE],
            )?,
            app_env: parse_optional_trimmed_string(map, ENV_APP_ENV)?,
            request_id: parse_optional_trimmed_string(map, ENV_REQUEST_ID)?,
            request_id_forwarded: parse_optional_trimmed_string(map, ENV_FORWARDED_REQUEST_ID)?,
        })
    }

    /// Parse overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_owned(), value);
            }
        }
        Self::from_map(&map)
    }

    /// Whether no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Apply env overrides on top of `base`, then validate and normalize.
pub fn apply_env_overrides(
    base: LogfitConfig,
    env: &LogfitEnv,
) -> Result<ValidatedConfig, ErrorEnvelope> {
    let mut config = base;

    set_value(&mut config.dump.max_dump_depth, env.max_dump_depth);
    set_value(&mut config.dump.max_record_length, env.max_record_length);
    set_value(
        &mut config.handler.ignore_record_level_below,
        env.ignore_record_level_below,
    );
    set_value(
        &mut config.handler.stop_when_level_above,
        env.stop_when_level_above,
    );
    set_text(&mut config.handler.app_env, env.app_env.as_deref());
    set_text(&mut config.handler.request_id, env.request_id.as_deref());
    set_text(
        &mut config.handler.request_id_forwarded,
        env.request_id_forwarded.as_deref(),
    );

    config.validate_and_normalize().map_err(Into::into)
}

fn set_value<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_text(field: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value {
        *field = Some(value.to_owned());
    }
}

/// Env parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Level env var named no known level.
    InvalidLevel {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidLevel { .. } => ErrorCode::new("config", "invalid_env_level"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidInt { var, .. } => {
                write!(formatter, "{var} must be a non-negative integer")
            },
            Self::InvalidLevel { var, .. } => {
                write!(formatter, "{var} must be a level name or ordinal")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidInt { var, value } | EnvParseError::InvalidLevel { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_if_secret(var, &value));
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<String>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned()))
}

fn parse_optional_usize(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<usize>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<usize>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Level>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Level::parse(raw)
        .map(Some)
        .map_err(|_| EnvParseError::InvalidLevel {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_level_any(
    map: &BTreeMap<String, String>,
    vars: &[&'static str],
) -> Result<Option<Level>, EnvParseError> {
    for var in vars {
        if map.contains_key(*var) {
            return parse_optional_level(map, var);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn empty_map_yields_no_overrides() -> Result<(), EnvParseError> {
        let env = LogfitEnv::from_map(&BTreeMap::new())?;
        assert!(env.is_empty());
        Ok(())
    }

    #[test]
    fn parses_numeric_and_named_levels() -> Result<(), EnvParseError> {
        let env = LogfitEnv::from_map(&env_map(&[
            (ENV_IGNORE_RECORD_LEVEL_BELOW, "250"),
            (ENV_STOP_WHEN_RECORD_LEVEL_ABOVE, "error"),
        ]))?;
        assert_eq!(env.ignore_record_level_below, Some(Level::Notice));
        assert_eq!(env.stop_when_level_above, Some(Level::Error));
        Ok(())
    }

    #[test]
    fn stop_alias_is_accepted() -> Result<(), EnvParseError> {
        let env = LogfitEnv::from_map(&env_map(&[(ENV_STOP_RECORD_LEVEL_ABOVE, "550")]))?;
        assert_eq!(env.stop_when_level_above, Some(Level::Alert));
        Ok(())
    }

    #[test]
    fn rejects_blank_and_malformed_values() {
        assert_eq!(
            LogfitEnv::from_map(&env_map(&[(ENV_APP_ENV, "   ")])),
            Err(EnvParseError::EmptyValue { var: ENV_APP_ENV })
        );
        assert_eq!(
            LogfitEnv::from_map(&env_map(&[(ENV_MAX_RECORD_LENGTH, "-3")])),
            Err(EnvParseError::InvalidInt {
                var: ENV_MAX_RECORD_LENGTH,
                value: "-3".to_owned(),
            })
        );
        assert!(matches!(
            LogfitEnv::from_map(&env_map(&[(ENV_IGNORE_RECORD_LEVEL_BELOW, "loud")])),
            Err(EnvParseError::InvalidLevel { .. })
        ));
    }

    #[test]
    fn overrides_win_and_are_validated() -> Result<(), ErrorEnvelope> {
        let env = LogfitEnv::from_map(&env_map(&[
            (ENV_MAX_DUMP_LEVEL, "3"),
            (ENV_MAX_RECORD_LENGTH, "1024"),
            (ENV_APP_ENV, "prod"),
        ]))
        .map_err(ErrorEnvelope::from)?;
        let config = apply_env_overrides(LogfitConfig::default(), &env)?;
        assert_eq!(config.dump.max_dump_depth, 3);
        assert_eq!(config.dump.max_record_length, 1024);
        assert_eq!(config.handler.app_env.as_deref(), Some("prod"));

        let too_small = LogfitEnv::from_map(&env_map(&[(ENV_MAX_RECORD_LENGTH, "4")]))
            .map_err(ErrorEnvelope::from)?;
        let error = apply_env_overrides(LogfitConfig::default(), &too_small).err();
        assert_eq!(
            error.map(|envelope| envelope.code),
            Some(ErrorCode::new("config", "invalid_limit"))
        );
        Ok(())
    }

    #[test]
    fn envelope_carries_env_var_metadata() {
        let envelope = ErrorEnvelope::from(EnvParseError::InvalidInt {
            var: ENV_MAX_DUMP_LEVEL,
            value: "deep".to_owned(),
        });
        assert_eq!(
            envelope.metadata.get("env_var").map(String::as_str),
            Some(ENV_MAX_DUMP_LEVEL)
        );
        assert_eq!(envelope.metadata.get("value").map(String::as_str), Some("deep"));
    }
}
