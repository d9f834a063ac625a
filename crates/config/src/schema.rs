//! Configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims text fields and keeps list fields sorted and deduped.

use logfit_domain::{
    DEFAULT_DEPTH_MARKER, DEFAULT_MAX_DUMP_DEPTH, DEFAULT_MAX_RECORD_LENGTH,
    DEFAULT_MAX_REDUCTION_STEPS, DEFAULT_PLACEHOLDER, DEFAULT_TOO_BIG_FALLBACK, DEFAULT_CHANNEL,
    Level, LengthUnit, MIN_RECORD_LENGTH, ReductionPolicy, SubstitutionOrder,
};
use logfit_shared::{BoundedU32, BoundedUsize, ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current config schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Inclusive depth ceiling bounds.
pub const MAX_DUMP_DEPTH_MIN: usize = 0;
/// Inclusive depth ceiling bounds.
pub const MAX_DUMP_DEPTH_MAX: usize = 64;
/// Smallest budget that still holds the minimal record.
pub const MAX_RECORD_LENGTH_MIN: usize = MIN_RECORD_LENGTH;
/// Largest accepted budget.
pub const MAX_RECORD_LENGTH_MAX: usize = 64 * 1024 * 1024;
/// Inclusive substitution cap bounds.
pub const MAX_REDUCTION_STEPS_MIN: usize = 1;
/// Inclusive substitution cap bounds.
pub const MAX_REDUCTION_STEPS_MAX: usize = 1_000_000;
/// Inclusive error chain depth bounds.
pub const ERROR_CHAIN_DEPTH_MIN: u32 = 1;
/// Inclusive error chain depth bounds.
pub const ERROR_CHAIN_DEPTH_MAX: u32 = 4096;
/// Default error chain depth.
pub const DEFAULT_ERROR_CHAIN_DEPTH: u32 = 64;

const PASS_CHANNELS_MAX: usize = 64;

/// Top-level logfit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LogfitConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Reducer settings.
    pub dump: DumpConfig,
    /// Handler pipeline settings.
    pub handler: HandlerConfig,
}

impl Default for LogfitConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            dump: DumpConfig::default(),
            handler: HandlerConfig::default(),
        }
    }
}

impl LogfitConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedConfig, ConfigSchemaError> {
        self.validate_version()?;

        self.dump.normalize();
        self.dump.validate()?;
        self.handler.normalize();
        self.handler.validate()?;

        let limits = ConfigLimits::new(&self)?;
        Ok(ValidatedConfig { raw: self, limits })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper carrying bounded numeric values.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    raw: LogfitConfig,
    limits: ConfigLimits,
}

impl ValidatedConfig {
    /// Access validated numeric bounds.
    #[must_use]
    pub const fn limits(&self) -> &ConfigLimits {
        &self.limits
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &LogfitConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> LogfitConfig {
        self.raw
    }

    /// Reducer policy built from the validated dump section.
    #[must_use]
    pub fn reduction_policy(&self) -> ReductionPolicy {
        let dump = &self.raw.dump;
        ReductionPolicy {
            max_dump_depth: self.limits.max_dump_depth.get(),
            max_record_length: self.limits.max_record_length.get(),
            placeholder: dump.placeholder.clone(),
            depth_marker: dump.depth_marker.clone(),
            too_big_fallback: dump.too_big_fallback.clone(),
            length_unit: dump.length_unit,
            max_reduction_steps: self.limits.max_reduction_steps.get(),
            substitution_order: dump.substitution_order,
        }
    }
}

impl AsRef<LogfitConfig> for ValidatedConfig {
    fn as_ref(&self) -> &LogfitConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedConfig {
    type Target = LogfitConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Validated numeric limits derived from the config.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLimits {
    /// Depth ceiling.
    pub max_dump_depth: BoundedUsize<MAX_DUMP_DEPTH_MIN, MAX_DUMP_DEPTH_MAX>,
    /// Output budget.
    pub max_record_length: BoundedUsize<MAX_RECORD_LENGTH_MIN, MAX_RECORD_LENGTH_MAX>,
    /// Substitution cap.
    pub max_reduction_steps: BoundedUsize<MAX_REDUCTION_STEPS_MIN, MAX_REDUCTION_STEPS_MAX>,
    /// Error cause chain depth.
    pub error_chain_max_depth: BoundedU32<ERROR_CHAIN_DEPTH_MIN, ERROR_CHAIN_DEPTH_MAX>,
}

impl ConfigLimits {
    fn new(config: &LogfitConfig) -> Result<Self, ConfigSchemaError> {
        Ok(Self {
            max_dump_depth: bounded_usize(
                "dump",
                "maxDumpDepth",
                config.dump.max_dump_depth,
                MAX_DUMP_DEPTH_MIN,
                MAX_DUMP_DEPTH_MAX,
            )?,
            max_record_length: bounded_usize(
                "dump",
                "maxRecordLength",
                config.dump.max_record_length,
                MAX_RECORD_LENGTH_MIN,
                MAX_RECORD_LENGTH_MAX,
            )?,
            max_reduction_steps: bounded_usize(
                "dump",
                "maxReductionSteps",
                config.dump.max_reduction_steps,
                MAX_REDUCTION_STEPS_MIN,
                MAX_REDUCTION_STEPS_MAX,
            )?,
            error_chain_max_depth: bounded_u32(
                "handler",
                "errorChainMaxDepth",
                config.handler.error_chain_max_depth,
                ERROR_CHAIN_DEPTH_MIN,
                ERROR_CHAIN_DEPTH_MAX,
            )?,
        })
    }
}

/// Parse a config from a JSON string, applying validation and normalization.
pub fn parse_config_json(input: &str) -> Result<ValidatedConfig, ErrorEnvelope> {
    let config: LogfitConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a config from a TOML string, applying validation and normalization.
pub fn parse_config_toml(input: &str) -> Result<ValidatedConfig, ErrorEnvelope> {
    let config: LogfitConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Reducer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DumpConfig {
    /// Depth ceiling for the depth search.
    pub max_dump_depth: usize,
    /// Output budget; written lines are strictly shorter.
    pub max_record_length: usize,
    /// Replacement for subtrees removed for size.
    pub placeholder: String,
    /// Replacement for subtrees cut by depth.
    pub depth_marker: String,
    /// Line written when nothing fits.
    pub too_big_fallback: String,
    /// Unit the budget is measured in.
    pub length_unit: LengthUnit,
    /// Cap on placeholder substitutions per record.
    pub max_reduction_steps: usize,
    /// Order substitution positions are visited in.
    pub substitution_order: SubstitutionOrder,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            max_dump_depth: DEFAULT_MAX_DUMP_DEPTH,
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            depth_marker: DEFAULT_DEPTH_MARKER.to_owned(),
            too_big_fallback: DEFAULT_TOO_BIG_FALLBACK.to_owned(),
            length_unit: LengthUnit::Chars,
            max_reduction_steps: DEFAULT_MAX_REDUCTION_STEPS,
            substitution_order: SubstitutionOrder::Reverse,
        }
    }
}

impl DumpConfig {
    fn normalize(&mut self) {
        self.too_big_fallback = self.too_big_fallback.trim().to_owned();
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.placeholder.is_empty() {
            return Err(ConfigSchemaError::EmptyText {
                section: "dump",
                field: "placeholder",
            });
        }
        if self.depth_marker.is_empty() {
            return Err(ConfigSchemaError::EmptyText {
                section: "dump",
                field: "depthMarker",
            });
        }
        if self.too_big_fallback.is_empty() {
            return Err(ConfigSchemaError::EmptyText {
                section: "dump",
                field: "tooBigFallback",
            });
        }
        if serde_json::from_str::<serde_json::Value>(&self.too_big_fallback).is_err() {
            return Err(ConfigSchemaError::InvalidFallback {
                reason: "must be a JSON document".to_owned(),
            });
        }
        Ok(())
    }
}

/// Handler pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct HandlerConfig {
    /// Records below this level are skipped.
    pub ignore_record_level_below: Level,
    /// Records above this level request a stop.
    pub stop_when_level_above: Level,
    /// Channels admitted at every level.
    pub pass_channels: Vec<String>,
    /// Skip records carrying an error with a client status (< 500).
    pub skip_client_errors: bool,
    /// Suppress a line identical to the previously written one.
    pub deduplicate: bool,
    /// Maximum cause chain depth kept on attached errors.
    pub error_chain_max_depth: u32,
    /// Environment name stamped into `extra.env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_env: Option<String>,
    /// Request id stamped into `extra.request_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Forwarded request id stamped into `extra.request_id_forwarded`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id_forwarded: Option<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            ignore_record_level_below: Level::Debug,
            stop_when_level_above: Level::Critical,
            pass_channels: vec![DEFAULT_CHANNEL.to_owned()],
            skip_client_errors: true,
            deduplicate: true,
            error_chain_max_depth: DEFAULT_ERROR_CHAIN_DEPTH,
            app_env: None,
            request_id: None,
            request_id_forwarded: None,
        }
    }
}

impl HandlerConfig {
    fn normalize(&mut self) {
        let mut channels: Vec<String> = self
            .pass_channels
            .iter()
            .map(|channel| channel.trim().to_owned())
            .collect();
        channels.sort();
        channels.dedup();
        self.pass_channels = channels;

        for field in [
            &mut self.app_env,
            &mut self.request_id,
            &mut self.request_id_forwarded,
        ] {
            *field = field
                .take()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty());
        }
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.pass_channels.len() > PASS_CHANNELS_MAX {
            return Err(ConfigSchemaError::ListTooLarge {
                section: "handler",
                field: "passChannels",
                len: self.pass_channels.len(),
                max: PASS_CHANNELS_MAX,
            });
        }
        if self.pass_channels.iter().any(String::is_empty) {
            return Err(ConfigSchemaError::EmptyText {
                section: "handler",
                field: "passChannels",
            });
        }
        Ok(())
    }
}

/// Config validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `dump`).
        section: &'static str,
        /// Field name in the config file (e.g. `maxRecordLength`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A text field is empty.
    EmptyText {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
    },
    /// A list field exceeds the maximum allowed size.
    ListTooLarge {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Number of entries after normalization/deduplication.
        len: usize,
        /// Maximum allowed number of entries.
        max: usize,
    },
    /// The fallback line is not usable.
    InvalidFallback {
        /// Human readable reason.
        reason: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::EmptyText { .. } => ErrorCode::new("config", "empty_text"),
            Self::ListTooLarge { .. } => ErrorCode::new("config", "list_too_large"),
            Self::InvalidFallback { .. } => ErrorCode::new("config", "invalid_fallback"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::EmptyText { section, field } => {
                write!(formatter, "{section}.{field} must not be empty")
            },
            Self::ListTooLarge {
                section,
                field,
                len,
                max,
            } => write!(
                formatter,
                "{section}.{field} must have at most {max} entries (got {len})"
            ),
            Self::InvalidFallback { reason } => {
                write!(formatter, "dump.tooBigFallback is invalid: {reason}")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::EmptyText { section, field } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field);
            },
            ConfigSchemaError::ListTooLarge {
                section,
                field,
                len,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidFallback { reason } => {
                envelope = envelope.with_metadata("reason", reason);
            },
        }

        envelope
    }
}

fn bounded_u32<const MIN: u32, const MAX: u32>(
    section: &'static str,
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<BoundedU32<MIN, MAX>, ConfigSchemaError> {
    BoundedU32::try_new(value).map_err(|_| ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value: u64::from(value),
        min: u64::from(min),
        max: u64::from(max),
    })
}

fn bounded_usize<const MIN: usize, const MAX: usize>(
    section: &'static str,
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<BoundedUsize<MIN, MAX>, ConfigSchemaError> {
    BoundedUsize::try_new(value).map_err(|_| ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value: widen(value),
        min: widen(min),
        max: widen(max),
    })
}

fn widen(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() -> Result<(), ConfigSchemaError> {
        let config = LogfitConfig::default().validate_and_normalize()?;
        assert_eq!(config.limits().max_record_length.get(), 16_000);
        assert_eq!(config.reduction_policy(), ReductionPolicy::default());
        assert_eq!(config.handler.pass_channels, vec!["app".to_owned()]);
        Ok(())
    }

    #[test]
    fn rejects_budget_below_minimal_record() {
        let mut config = LogfitConfig::default();
        config.dump.max_record_length = MIN_RECORD_LENGTH - 1;
        let error = config.validate_and_normalize().err();
        assert!(matches!(
            error,
            Some(ConfigSchemaError::LimitOutOfRange {
                field: "maxRecordLength",
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_placeholder() {
        let mut config = LogfitConfig::default();
        config.dump.placeholder = String::new();
        let error = config.validate_and_normalize().err();
        assert_eq!(
            error,
            Some(ConfigSchemaError::EmptyText {
                section: "dump",
                field: "placeholder",
            })
        );
    }

    #[test]
    fn rejects_non_json_fallback() {
        let mut config = LogfitConfig::default();
        config.dump.too_big_fallback = "too big!".to_owned();
        assert!(matches!(
            config.validate_and_normalize(),
            Err(ConfigSchemaError::InvalidFallback { .. })
        ));
    }

    #[test]
    fn normalizes_channels_and_blank_options() -> Result<(), ConfigSchemaError> {
        let mut config = LogfitConfig::default();
        config.handler.pass_channels = vec![
            " security ".to_owned(),
            "app".to_owned(),
            "app".to_owned(),
        ];
        config.handler.app_env = Some("  ".to_owned());
        config.handler.request_id = Some(" abc ".to_owned());

        let validated = config.validate_and_normalize()?;
        assert_eq!(
            validated.handler.pass_channels,
            vec!["app".to_owned(), "security".to_owned()]
        );
        assert_eq!(validated.handler.app_env, None);
        assert_eq!(validated.handler.request_id.as_deref(), Some("abc"));
        Ok(())
    }

    #[test]
    fn schema_errors_map_to_envelopes() {
        let envelope = ErrorEnvelope::from(ConfigSchemaError::UnsupportedVersion {
            found: 9,
            supported: CURRENT_CONFIG_VERSION,
        });
        assert_eq!(
            envelope.code,
            ErrorCode::new("config", "unsupported_version")
        );
        assert_eq!(envelope.metadata.get("found").map(String::as_str), Some("9"));
    }
}
