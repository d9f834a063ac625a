//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{ReduceCommandInput, run_config_check, run_config_show, run_info, run_reduce};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use logfit_adapters::capture_std_error;
use logfit_config::{ENV_LOG_FILTER, LogfitEnv};
use logfit_domain::{DEFAULT_MAX_DUMP_DEPTH, DEFAULT_MAX_RECORD_LENGTH, Level, Record};
use logfit_shared::ErrorEnvelope;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(
    name = "logfit",
    version,
    about = "Fit structured log records into a length budget",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show build details and default reduction policy.
    Info,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Reduce NDJSON records into bounded JSON lines.
    Reduce {
        /// NDJSON input file (defaults to stdin).
        #[arg(long)]
        input: Option<PathBuf>,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Max dump depth override.
        #[arg(long)]
        max_depth: Option<usize>,
        /// Record length budget override.
        #[arg(long)]
        budget: Option<usize>,
        /// Write bounded lines to stderr instead of stdout.
        #[arg(long)]
        stderr: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate the effective config.
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Partial config JSON applied on top of the file.
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Print the effective config.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Partial config JSON applied on top of the file.
        #[arg(long)]
        overrides_json: Option<String>,
        /// Render as TOML instead of JSON.
        #[arg(long)]
        toml: bool,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    if let Err(error) = init_tracing() {
        return exit_with_error(&error);
    }

    match run(&cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn init_tracing() -> Result<(), CliError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(ENV_LOG_FILTER)
        .from_env()
        .map_err(|error| CliError::Logging(error.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|error| CliError::Logging(error.to_string()))
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "{}", failure_line(error));
    std::process::ExitCode::from(error.exit_code().as_u8())
}

/// A failure outside any command output, as one bounded record line.
fn failure_line(error: &CliError) -> String {
    let record = Record::new(Level::Critical, "logfit", format!("error: {error}"))
        .with_error(capture_std_error(error));
    logfit_dump::reduce(&record, DEFAULT_MAX_DUMP_DEPTH, DEFAULT_MAX_RECORD_LENGTH)
}

fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    if matches!(command, Commands::Info) {
        return run_info(mode);
    }

    let env = match LogfitEnv::from_std_env() {
        Ok(env) => env,
        Err(error) => {
            return Ok(format_error_output(
                mode,
                &ErrorEnvelope::from(error),
                ExitCode::InvalidInput,
            ));
        },
    };

    match command {
        Commands::Info => run_info(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Check {
                path,
                overrides_json,
            } => run_config_check(mode, &env, path.as_deref(), overrides_json.as_deref()),
            ConfigCommands::Show {
                path,
                overrides_json,
                toml,
            } => run_config_show(
                mode,
                &env,
                path.as_deref(),
                overrides_json.as_deref(),
                *toml,
            ),
        },
        Commands::Reduce {
            input,
            config,
            max_depth,
            budget,
            stderr,
        } => run_reduce(
            mode,
            &env,
            &ReduceCommandInput {
                input: input.as_deref(),
                config: config.as_deref(),
                max_depth: *max_depth,
                budget: *budget,
                to_stderr: *stderr,
            },
        ),
    }
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &ErrorEnvelope,
    exit_code: ExitCode,
) -> CliOutput {
    let error = error.clone().redact_secrets();

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        let payload = serde_json::json!({
            "type": "error",
            "status": "error",
            "error": error_payload(&error),
        });
        let mut out = serde_json::to_string(&payload).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"unexpected\"}}".to_string()
        });
        out.push('\n');
        out
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": error_payload(&error),
        });
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"unexpected\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_error_text(&error)
    };

    CliOutput {
        stdout,
        stderr,
        exit_code,
    }
}

fn error_payload(error: &ErrorEnvelope) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "code": error.code.to_string(),
        "message": error.message,
        "kind": error.kind,
    });
    if !error.metadata.is_empty()
        && let serde_json::Value::Object(map) = &mut payload
    {
        map.insert("meta".to_owned(), serde_json::json!(error.metadata));
    }
    payload
}

fn format_error_text(error: &ErrorEnvelope) -> String {
    let mut out = format!(
        "status: error\ncode: {}\nmessage: {}\nkind: {}\n",
        error.code, error.message, error.kind
    );
    if !error.metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in &error.metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

pub(crate) fn format_ndjson_summary(
    status: &str,
    kind: &str,
    extra: Option<serde_json::Value>,
) -> String {
    let mut payload = serde_json::Map::new();
    payload.insert("type".to_string(), "summary".into());
    payload.insert("status".to_string(), status.into());
    payload.insert("kind".to_string(), kind.into());
    if let Some(serde_json::Value::Object(map)) = extra {
        for (key, value) in map {
            payload.insert(key, value);
        }
    }
    let mut out = serde_json::to_string(&serde_json::Value::Object(payload)).unwrap_or_else(|_| {
        "{\"type\":\"summary\",\"status\":\"error\",\"kind\":\"internal\"}".to_string()
    });
    out.push('\n');
    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
