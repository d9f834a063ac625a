//! CLI reduce E2E tests.

use std::io::{self, Write};
use std::process::{Command, Output, Stdio};

const EH_VARS: [&str; 8] = [
    "EH_MAX_DUMP_LEVEL",
    "EH_MAX_RECORD_LENGTH",
    "EH_IGNORE_RECORD_LEVEL_BELOW",
    "EH_STOP_WHEN_RECORD_LEVEL_ABOVE",
    "EH_STOP_RECORD_LEVEL_ABOVE",
    "APP_ENV",
    "REQUEST_ID",
    "HTTP_X_FORWARDED_REQUEST_ID",
];

fn logfit(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_logfit"));
    command.args(args);
    for key in EH_VARS {
        command.env_remove(key);
    }
    command.env_remove("LOGFIT_LOG");
    command
}

fn run_with_stdin(mut command: Command, input: &str) -> io::Result<Output> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("stdin not captured"))?
        .write_all(input.as_bytes())?;
    child.wait_with_output()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn reduce_writes_one_bounded_line_per_admitted_record() -> io::Result<()> {
    let input = concat!(
        "{\"level\":\"INFO\",\"channel\":\"app\",\"message\":\"hello\",\"context\":{\"user\":7}}\n",
        "{\"level\":\"DEBUG\",\"channel\":\"doctrine\",\"message\":\"select 1\"}\n",
        "{\"level\":\"ERROR\",\"channel\":\"app\",\"message\":\"boom\"}\n",
    );
    let output = run_with_stdin(logfit(&["--no-progress", "reduce"]), input)?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).map_err(io::Error::other)?;
        assert_eq!(value["extra"]["env"], "-");
    }
    assert!(lines.first().is_some_and(|line| line.contains("\"context\":{\"user\":7}")));
    Ok(())
}

#[test]
fn reduce_output_is_deterministic() -> io::Result<()> {
    let input = "{\"level\":\"ERROR\",\"message\":\"same\",\"context\":{\"a\":{\"b\":{\"c\":{\"d\":{\"e\":{\"f\":\"a long leaf value\"}}}}}}}\n";
    let first = run_with_stdin(logfit(&["--no-progress", "reduce"]), input)?;
    let second = run_with_stdin(logfit(&["--no-progress", "reduce"]), input)?;

    assert_eq!(first.stdout, second.stdout);
    let text = String::from_utf8_lossy(&first.stdout);
    assert!(text.contains("**MAX_DEPTH**"));
    Ok(())
}

#[test]
fn budget_flag_bounds_every_line() -> io::Result<()> {
    let input = format!(
        "{{\"level\":\"ERROR\",\"message\":\"{}\",\"context\":{{\"blob\":\"{}\"}}}}\n",
        "m".repeat(300),
        "b".repeat(3_000)
    );
    let output = run_with_stdin(
        logfit(&["--no-progress", "reduce", "--budget", "256"]),
        &input,
    )?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines.iter().all(|line| line.chars().count() < 256));
    assert!(lines.iter().all(|line| line.contains("too big")));
    Ok(())
}

#[test]
fn env_budget_is_applied_under_the_flag() -> io::Result<()> {
    let input = format!("{{\"level\":\"ERROR\",\"message\":\"{}\"}}\n", "m".repeat(500));
    let mut command = logfit(&["--no-progress", "reduce"]);
    command.env("EH_MAX_RECORD_LENGTH", "120");
    let output = run_with_stdin(command, &input)?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert!(lines.iter().all(|line| line.chars().count() < 120));
    Ok(())
}

#[test]
fn budget_below_the_minimum_is_rejected() -> io::Result<()> {
    let output = logfit(&[
        "--json",
        "reduce",
        "--budget",
        "3",
        "--input",
        "never-read.ndjson",
    ])
    .output()?;
    assert_eq!(output.status.code(), Some(2));

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["code"], "config:invalid_limit");
    Ok(())
}

#[test]
fn emergency_records_stop_the_run() -> io::Result<()> {
    let input = concat!(
        "{\"level\":\"EMERGENCY\",\"message\":\"down\"}\n",
        "{\"level\":\"ERROR\",\"message\":\"after\"}\n",
    );
    let output = run_with_stdin(logfit(&["--agent", "reduce"]), input)?;
    assert_eq!(output.status.code(), Some(4));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    let summary: serde_json::Value = serde_json::from_str(lines.last().map_or("", String::as_str))
        .map_err(io::Error::other)?;
    assert_eq!(summary["status"], "stopped");
    assert_eq!(summary["stoppedAtLine"], 1);
    Ok(())
}

#[test]
fn stderr_flag_moves_lines_off_stdout() -> io::Result<()> {
    let output = run_with_stdin(
        logfit(&["--no-progress", "reduce", "--stderr"]),
        "{\"level\":\"ERROR\",\"message\":\"to stderr\"}\n",
    )?;
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("\"message\":\"to stderr\""));
    Ok(())
}

#[test]
fn missing_input_file_is_an_io_error() -> io::Result<()> {
    let output = logfit(&["reduce", "--input", "does-not-exist.ndjson"]).output()?;
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stdout).contains("status: error"));
    Ok(())
}
