//! Command handlers and output formatting

use crate::Command;
use anyhow::{Context, Result};
use dockashell_foundation::{Error, TraceQuery, TraceRecord};
use dockashell_task::{
    ExecOptions, ExecutionResult, ProjectManager, ProjectStatus, StartResult, StopResult,
};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Dispatch one subcommand. Returns the process exit code.
pub(crate) async fn run(command: Command, json: bool) -> Result<i32> {
    debug!(?command, json, "dispatch");
    let manager = ProjectManager::connect().context("Failed to initialize DockaShell")?;

    match command {
        Command::Start { project } => {
            let result = manager.start_project(&project).await?;
            emit(json, &result, || print_start(&project, &result))?;
        }
        Command::Stop { project } => {
            let result = manager.stop_project(&project).await?;
            emit(json, &result, || print_stop(&project, &result))?;
        }
        Command::Status { project } => {
            let status = manager.project_status(&project).await?;
            emit(json, &status, || print_status(&project, &status))?;
        }
        Command::Run {
            project,
            timeout,
            command,
        } => {
            let options = exec_options(timeout)?;
            let result = manager
                .run_command(&project, &command.join(" "), options)
                .await?;
            return finish_exec(json, &result);
        }
        Command::Patch {
            project,
            file,
            timeout,
        } => {
            let patch = read_input(file.as_deref())?;
            let options = exec_options(timeout)?;
            let result = manager.apply_patch(&project, &patch, options).await?;
            return finish_exec(json, &result);
        }
        Command::Write {
            project,
            path,
            content,
            overwrite,
            timeout,
        } => {
            let content = match content {
                Some(content) => content,
                None => read_input(None)?,
            };
            let options = exec_options(timeout)?;
            let result = manager
                .write_file(&project, &path, &content, overwrite, options)
                .await?;
            return finish_exec(json, &result);
        }
        Command::Traces {
            project,
            kind,
            search,
            skip,
            limit,
        } => {
            let mut query = TraceQuery::new().with_skip(skip).with_limit(limit);
            if let Some(kind) = kind {
                query = query.with_filter(kind);
            }
            if let Some(search) = search {
                query = query.with_search(search);
            }
            let records = manager.read_traces(&project, &query).await?;
            emit(json, &records, || print_traces(&records))?;
        }
        Command::Note {
            project,
            note_type,
            text,
        } => {
            let entry = manager
                .write_trace(&project, note_type, &text.join(" "))
                .await?;
            emit(json, &entry, || println!("Recorded {} note {}", note_type, entry.id))?;
        }
        Command::Projects => {
            let projects = manager.list_projects()?;
            emit(json, &projects, || {
                if projects.is_empty() {
                    println!(
                        "No projects configured under {}",
                        manager.projects().projects_root().display()
                    );
                }
                for name in &projects {
                    println!("{}", name);
                }
            })?;
        }
    }

    Ok(0)
}

fn exec_options(timeout: Option<f64>) -> Result<ExecOptions> {
    match timeout {
        None => Ok(ExecOptions::default()),
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            Ok(ExecOptions::with_timeout(Duration::from_secs_f64(secs)))
        }
        Some(secs) => Err(Error::invalid_input(format!(
            "Timeout must be a positive number of seconds, got {}",
            secs
        ))
        .into()),
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}

/// Print an exec result; a failed exec maps to a non-zero exit code
fn finish_exec(json: bool, result: &ExecutionResult) -> Result<i32> {
    emit(json, result, || print_exec(result))?;
    if result.success {
        return Ok(0);
    }
    if result.timed_out {
        return Ok(124);
    }
    Ok(i32::try_from(result.exit_code)
        .ok()
        .filter(|code| *code != 0)
        .unwrap_or(1))
}

/// Failure payload; `--json` prints it as `{"error": ...}` on stdout
#[derive(Debug, Serialize)]
struct ErrorReport {
    code: &'static str,
    message: String,
    retryable: bool,
}

/// Exit code for errors the caller can fix (bad input, blocked, not running)
const EXIT_USER_ERROR: i32 = 2;

/// Classify a failed command by the DockaShell error in its chain
fn error_report(err: &anyhow::Error) -> (ErrorReport, i32) {
    let source = err.chain().find_map(|cause| cause.downcast_ref::<Error>());
    let report = ErrorReport {
        code: source.map_or("internal_error", Error::code),
        message: format!("{:#}", err),
        retryable: source.is_some_and(Error::is_retryable),
    };
    let exit_code = if source.is_some_and(Error::is_user_facing) {
        EXIT_USER_ERROR
    } else {
        1
    };
    (report, exit_code)
}

/// Print a failed command and return its exit code
pub(crate) fn report_error(err: &anyhow::Error, json: bool) -> i32 {
    let (report, exit_code) = error_report(err);
    debug!(code = report.code, exit_code, "command failed");
    if json {
        let body = serde_json::json!({ "error": report });
        match serde_json::to_string_pretty(&body) {
            Ok(text) => println!("{}", text),
            Err(_) => eprintln!("error[{}]: {}", report.code, report.message),
        }
    } else {
        eprintln!("error[{}]: {}", report.code, report.message);
        if report.retryable {
            eprintln!("  (the Docker daemon may be busy; retrying can help)");
        }
    }
    exit_code
}

// ============================================================================
// Text output
// ============================================================================

fn print_start(project: &str, result: &StartResult) {
    let verb = match result.status {
        dockashell_task::StartStatus::Started => "Started",
        dockashell_task::StartStatus::AlreadyRunning => "Already running",
    };
    println!("{}: {} ({})", verb, project, short_id(&result.container_id));
    println!("  image: {}", result.image);
    for port in &result.ports {
        println!("  port:  {} -> {}", port.host, port.container);
    }
    for mount in &result.mounts {
        println!(
            "  mount: {} -> {} ({:?})",
            mount.source, mount.destination, mount.mode
        );
    }
}

fn print_stop(project: &str, result: &StopResult) {
    match result.status {
        dockashell_task::StopStatus::Stopped => println!("Stopped: {}", project),
        dockashell_task::StopStatus::NotFound => println!("No container for {}", project),
    }
}

fn print_status(project: &str, status: &ProjectStatus) {
    let state = serde_json::to_value(status.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    println!("{}: {}", project, state);
    if let Some(id) = &status.container_id {
        println!("  id:      {}", short_id(id));
    }
    if let Some(image) = &status.image {
        println!("  image:   {}", image);
    }
    if let Some(started) = &status.started_at {
        println!("  started: {}", started);
    }
    for port in &status.ports {
        println!("  port:    {} -> {}", port.host, port.container);
    }
    for mount in &status.mounts {
        println!(
            "  mount:   {} -> {} ({:?})",
            mount.source, mount.destination, mount.mode
        );
    }
}

fn print_exec(result: &ExecutionResult) {
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
        if !result.stderr.ends_with('\n') {
            eprintln!();
        }
    }
    if result.timed_out {
        eprintln!("[timed out after {}ms]", result.duration_ms);
    } else if !result.success {
        eprintln!("[exit code {}]", result.exit_code);
    }
}

fn print_traces(records: &[TraceRecord]) {
    if records.is_empty() {
        println!("No trace entries");
        return;
    }
    for record in records {
        let label = match record.note_type {
            Some(note_type) => format!("note:{}", note_type),
            None => record.kind.to_string(),
        };
        let summary = record
            .command()
            .or_else(|| record.text())
            .or_else(|| record.payload.get("path").and_then(|v| v.as_str()))
            .unwrap_or("");
        println!(
            "{}  {:<12} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            label,
            first_line(summary)
        );
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
