//! # logfit-config
//!
//! Configuration schema, validation, env overrides, and loading for the
//! reducer and the handler pipeline. This crate depends on `domain` and
//! `shared` only.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (file + overrides + env).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigLimits, ConfigSchemaError, DEFAULT_ERROR_CHAIN_DEPTH,
    DumpConfig, HandlerConfig, LogfitConfig, ValidatedConfig, parse_config_json,
    parse_config_toml,
};

pub use env::{ENV_LOG_FILTER, EnvParseError, LogfitEnv, apply_env_overrides};
pub use load::{
    ConfigFormat, detect_config_format, load_config_from_path, load_config_from_sources,
    load_config_std_env, to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
