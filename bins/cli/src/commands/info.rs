//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use logfit_adapters::adapters_crate_version;
use logfit_config::{CURRENT_CONFIG_VERSION, config_crate_version};
use logfit_domain::{MIN_RECORD_LENGTH, ReductionPolicy};
use logfit_dump::dump_crate_version;

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let policy = ReductionPolicy::default();

    let stdout = if mode.is_ndjson() {
        let mut payload = info_payload(&policy);
        if let serde_json::Value::Object(map) = &mut payload {
            map.insert("type".to_owned(), "summary".into());
            map.insert("kind".to_owned(), "info".into());
        }
        let mut output = serde_json::to_string(&payload)?;
        output.push('\n');
        output
    } else if mode.is_json() {
        let mut output = serde_json::to_string_pretty(&info_payload(&policy))?;
        output.push('\n');
        output
    } else {
        format_info_text(&policy)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text(policy: &ReductionPolicy) -> String {
    format!(
        "status: ok\nname: {}\nversion: {}\ndump: {}\nconfig: {} (schema v{})\nadapters: {}\ndefault max depth: {}\ndefault budget: {} {}\nminimum budget: {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        dump_crate_version(),
        config_crate_version(),
        CURRENT_CONFIG_VERSION,
        adapters_crate_version(),
        policy.max_dump_depth,
        policy.max_record_length,
        policy.length_unit.as_str(),
        MIN_RECORD_LENGTH,
    )
}

fn info_payload(policy: &ReductionPolicy) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "build": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "dumpVersion": dump_crate_version(),
            "configVersion": config_crate_version(),
            "configSchema": CURRENT_CONFIG_VERSION,
            "adaptersVersion": adapters_crate_version(),
        },
        "defaults": {
            "maxDumpDepth": policy.max_dump_depth,
            "maxRecordLength": policy.max_record_length,
            "lengthUnit": policy.length_unit.as_str(),
            "minRecordLength": MIN_RECORD_LENGTH,
            "placeholder": policy.placeholder,
            "depthMarker": policy.depth_marker,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;

    #[test]
    fn text_info_lists_versions_and_defaults() -> Result<(), CliError> {
        let output = run_info(OutputMode::quiet(OutputFormat::Text))?;
        assert_eq!(output.exit_code, ExitCode::Ok);
        assert!(output.stdout.starts_with("status: ok\nname: logfit-cli\n"));
        assert!(output.stdout.contains("default budget: 16000 chars\n"));
        assert!(output.stdout.contains("minimum budget: 15\n"));
        Ok(())
    }

    #[test]
    fn ndjson_info_is_one_summary_line() -> Result<(), Box<dyn std::error::Error>> {
        let output = run_info(OutputMode::quiet(OutputFormat::Ndjson))?;
        assert_eq!(output.stdout.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
        assert_eq!(value["type"], "summary");
        assert_eq!(value["kind"], "info");
        assert_eq!(value["defaults"]["maxDumpDepth"], 5);
        Ok(())
    }
}
