//! Reduce command: NDJSON records in, bounded lines out.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use logfit_adapters::{
    BoundedJsonHandler, CountingObserver, FanOutObserver, HandleOutcome, LogSink, MemoryLogSink,
    StderrLogSink, TracingObserver,
};
use logfit_config::{LogfitEnv, ValidatedConfig, load_config_from_path};
use logfit_domain::Record;
use logfit_shared::{ErrorCode, ErrorEnvelope};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Flags of the reduce command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceCommandInput<'a> {
    /// NDJSON input file; stdin when `None`.
    pub input: Option<&'a Path>,
    /// Config file (JSON or TOML).
    pub config: Option<&'a Path>,
    /// `dump.maxDumpDepth` override.
    pub max_depth: Option<usize>,
    /// `dump.maxRecordLength` override.
    pub budget: Option<usize>,
    /// Write bounded lines to stderr instead of stdout.
    pub to_stderr: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReduceSummary {
    records: u64,
    written: u64,
    skipped: u64,
    duplicates: u64,
    invalid: u64,
    substituted: u64,
    fallbacks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stopped_at_line: Option<usize>,
}

impl ReduceSummary {
    const fn status(&self) -> &'static str {
        if self.stopped_at_line.is_some() {
            "stopped"
        } else if self.invalid > 0 {
            "partial"
        } else {
            "ok"
        }
    }

    const fn exit_code(&self) -> ExitCode {
        if self.stopped_at_line.is_some() {
            ExitCode::Stopped
        } else if self.invalid > 0 {
            ExitCode::InvalidInput
        } else {
            ExitCode::Ok
        }
    }
}

/// Run the reduce command.
pub fn run_reduce(
    mode: OutputMode,
    env: &LogfitEnv,
    input: &ReduceCommandInput<'_>,
) -> Result<CliOutput, CliError> {
    let overrides_json = build_overrides_json(input.max_depth, input.budget)?;
    let config = match load_config_from_path(input.config, overrides_json.as_deref(), env) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };
    let text = match read_input(input.input) {
        Ok(text) => text,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::Io)),
    };

    reduce_text(mode, &config, &text, input.to_stderr)
}

fn reduce_text(
    mode: OutputMode,
    config: &ValidatedConfig,
    text: &str,
    to_stderr: bool,
) -> Result<CliOutput, CliError> {
    let memory = Arc::new(MemoryLogSink::new());
    let sink: Arc<dyn LogSink> = if to_stderr {
        Arc::new(StderrLogSink)
    } else {
        memory.clone()
    };
    let counts = Arc::new(CountingObserver::new());
    let observer = FanOutObserver::new()
        .with(counts.clone())
        .with(Arc::new(TracingObserver));
    let handler = BoundedJsonHandler::from_config(config, sink, Arc::new(observer));

    let mut summary = ReduceSummary::default();
    let mut stderr = String::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        summary.records += 1;

        let record = match parse_record(line) {
            Ok(record) => record,
            Err(error) => {
                summary.invalid += 1;
                tracing::warn!(line = line_number, code = %error.code, "record rejected");
                stderr.push_str(&format!("warn: line {line_number}: {}\n", error.message));
                continue;
            },
        };

        match handler.handle(record) {
            HandleOutcome::Skipped => summary.skipped += 1,
            HandleOutcome::Duplicate => summary.duplicates += 1,
            outcome @ HandleOutcome::Written { .. } => {
                summary.written += 1;
                if outcome.stop_requested() {
                    summary.stopped_at_line = Some(line_number);
                    break;
                }
            },
        }
    }

    let observed = counts.snapshot();
    summary.substituted = observed.substituted;
    summary.fallbacks = observed.fallbacks();

    log_info(
        &mut stderr,
        &format!(
            "reduced {} records: {} written, {} skipped, {} duplicates, {} invalid",
            summary.records, summary.written, summary.skipped, summary.duplicates, summary.invalid
        ),
        mode.no_progress,
    );
    if let Some(line) = summary.stopped_at_line {
        log_info(
            &mut stderr,
            &format!("stop requested by the record on line {line}"),
            mode.no_progress,
        );
    }

    let lines = memory.take();
    let stdout = if mode.is_ndjson() {
        let mut out = lines.concat();
        out.push_str(&format_ndjson_summary(
            summary.status(),
            "reduce",
            Some(serde_json::to_value(&summary)?),
        ));
        out
    } else if mode.is_json() {
        let trimmed: Vec<&str> = lines.iter().map(|line| line.trim_end()).collect();
        let payload = serde_json::json!({
            "status": summary.status(),
            "lines": trimmed,
            "summary": summary,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        lines.concat()
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: summary.exit_code(),
    })
}

fn parse_record(line: &str) -> Result<Record, ErrorEnvelope> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|error| {
        ErrorEnvelope::expected(ErrorCode::new("cli", "invalid_record_json"), error.to_string())
    })?;
    Record::from_json(value).map_err(ErrorEnvelope::from)
}

fn read_input(path: Option<&Path>) -> Result<String, ErrorEnvelope> {
    let bytes = match path {
        Some(path) => std::fs::read(path).map_err(|error| {
            ErrorEnvelope::from(error).with_metadata("path", path.to_string_lossy())
        })?,
        None => {
            let mut bytes = Vec::new();
            std::io::stdin().lock().read_to_end(&mut bytes)?;
            bytes
        },
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn build_overrides_json(
    max_depth: Option<usize>,
    budget: Option<usize>,
) -> Result<Option<String>, CliError> {
    let mut dump = serde_json::Map::new();
    if let Some(depth) = max_depth {
        dump.insert("maxDumpDepth".to_owned(), depth.into());
    }
    if let Some(budget) = budget {
        dump.insert("maxRecordLength".to_owned(), budget.into());
    }
    if dump.is_empty() {
        return Ok(None);
    }

    let payload = serde_json::json!({ "dump": dump });
    Ok(Some(serde_json::to_string(&payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;
    use logfit_config::LogfitConfig;

    fn config(budget: usize) -> Result<ValidatedConfig, ErrorEnvelope> {
        let mut raw = LogfitConfig::default();
        raw.dump.max_record_length = budget;
        raw.validate_and_normalize().map_err(ErrorEnvelope::from)
    }

    #[test]
    fn overrides_are_built_only_from_given_flags() -> Result<(), CliError> {
        assert_eq!(build_overrides_json(None, None)?, None);
        assert_eq!(
            build_overrides_json(Some(3), Some(500))?.as_deref(),
            Some(r#"{"dump":{"maxDumpDepth":3,"maxRecordLength":500}}"#)
        );
        assert_eq!(
            build_overrides_json(None, Some(64))?.as_deref(),
            Some(r#"{"dump":{"maxRecordLength":64}}"#)
        );
        Ok(())
    }

    #[test]
    fn text_mode_prints_one_line_per_written_record() -> Result<(), Box<dyn std::error::Error>> {
        let input = concat!(
            "{\"level\":\"INFO\",\"channel\":\"app\",\"message\":\"first\"}\n",
            "\n",
            "{\"level\":\"INFO\",\"channel\":\"doctrine\",\"message\":\"query\"}\n",
            "not json\n",
            "{\"level\":\"WARNING\",\"channel\":\"app\",\"message\":\"second\"}\n",
        );
        let output = reduce_text(
            OutputMode::quiet(OutputFormat::Text),
            &config(16_000)?,
            input,
            false,
        )?;

        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.first().is_some_and(|line| line.contains("\"message\":\"first\"")));
        assert!(lines.get(1).is_some_and(|line| line.contains("\"message\":\"second\"")));
        assert!(output.stderr.starts_with("warn: line 4: "));
        Ok(())
    }

    #[test]
    fn ndjson_mode_appends_a_summary() -> Result<(), Box<dyn std::error::Error>> {
        let input = "{\"level\":\"ERROR\",\"message\":\"boom\"}\n{\"level\":\"ERROR\",\"message\":\"boom\"}\n";
        let output = reduce_text(
            OutputMode::quiet(OutputFormat::Ndjson),
            &config(16_000)?,
            input,
            false,
        )?;

        assert_eq!(output.exit_code, ExitCode::Ok);
        let summary = output.stdout.lines().last().ok_or("missing summary")?;
        let summary: serde_json::Value = serde_json::from_str(summary)?;
        assert_eq!(summary["type"], "summary");
        assert_eq!(summary["kind"], "reduce");
        assert_eq!(summary["records"], 2);
        assert_eq!(summary["written"], 1);
        assert_eq!(summary["duplicates"], 1);
        Ok(())
    }

    #[test]
    fn stop_requests_end_processing() -> Result<(), Box<dyn std::error::Error>> {
        let input = concat!(
            "{\"level\":\"EMERGENCY\",\"message\":\"down\"}\n",
            "{\"level\":\"INFO\",\"message\":\"never\"}\n",
        );
        let output = reduce_text(
            OutputMode::quiet(OutputFormat::Json),
            &config(16_000)?,
            input,
            false,
        )?;

        assert_eq!(output.exit_code, ExitCode::Stopped);
        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
        assert_eq!(value["status"], "stopped");
        assert_eq!(value["summary"]["stoppedAtLine"], 1);
        assert_eq!(value["lines"].as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[test]
    fn tight_budgets_are_counted() -> Result<(), Box<dyn std::error::Error>> {
        let input = format!(
            "{{\"level\":\"ERROR\",\"message\":\"{}\"}}\n",
            "x".repeat(400)
        );
        let output = reduce_text(
            OutputMode::quiet(OutputFormat::Json),
            &config(200)?,
            &input,
            false,
        )?;

        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
        assert_eq!(value["summary"]["substituted"], 1);
        assert_eq!(value["summary"]["fallbacks"], 0);
        Ok(())
    }
}
