//! Config command handlers.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use logfit_config::{LogfitEnv, load_config_from_path, to_pretty_json, to_pretty_toml};
use std::path::Path;

/// Validate the effective config (file, overrides, env).
pub fn run_config_check(
    mode: OutputMode,
    env: &LogfitEnv,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let config = match load_config_from_path(path, overrides_json, env) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.no_progress);

    let limits = config.limits();
    let stdout = if mode.is_ndjson() {
        format_ndjson_summary("ok", "config", None)
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "limits": {
                "maxDumpDepth": limits.max_dump_depth.get(),
                "maxRecordLength": limits.max_record_length.get(),
                "maxReductionSteps": limits.max_reduction_steps.get(),
                "errorChainMaxDepth": limits.error_chain_max_depth.get(),
            },
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Print the effective config.
pub fn run_config_show(
    mode: OutputMode,
    env: &LogfitEnv,
    path: Option<&Path>,
    overrides_json: Option<&str>,
    as_toml: bool,
) -> Result<CliOutput, CliError> {
    let config = match load_config_from_path(path, overrides_json, env) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };
    let rendered = if as_toml {
        to_pretty_toml(&config)
    } else {
        to_pretty_json(&config)
    };
    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::Internal)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        let effective = serde_json::to_value(&*config)?;
        format_ndjson_summary(
            "ok",
            "config",
            Some(serde_json::json!({ "effectiveConfig": effective })),
        )
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": serde_json::to_value(&*config)?,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let mut out = String::from("status: ok\nconfig:\n");
        out.push_str(&rendered);
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}
