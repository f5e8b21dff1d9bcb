//! Subcommand implementations.

use crate::config::AppConfig;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tracescope_log::{EventLog, TracePayload};
use tracescope_replay::{reconstruct, ProgramState};
use tracescope_runtime::{PlaybackCommand, PlaybackDriver, PlaybackScheduler};
use tracescope_sandbox::{ProcessInterpreter, RunRequest, Session};
use tracescope_tui::{fmt_value, TuiApp};

/// Output format for `inspect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable
    Text,
    /// JSON document
    Json,
}

/// Read and decode a trace file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a valid trace
pub fn load_trace(path: &Path) -> Result<EventLog> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read trace {}", path.display()))?;
    let payload = TracePayload::from_json(&text)
        .wrap_err_with(|| format!("invalid trace {}", path.display()))?;
    let log = EventLog::from_payload(payload);
    tracing::info!(path = %path.display(), run = %log.run_id(), events = log.len(), "trace loaded");
    Ok(log)
}

/// Resolve an optional `--step` argument; absent means the last step
fn step_or_last(log: &EventLog, step: Option<i64>) -> i64 {
    step.unwrap_or_else(|| i64::try_from(log.max_step()).unwrap_or(i64::MAX))
}

#[derive(Serialize)]
struct Inspection<'a> {
    run_id: String,
    step_index: Option<usize>,
    max_step: usize,
    line: Option<u32>,
    state: &'a ProgramState,
}

/// Render the state at a step
///
/// # Errors
///
/// Returns error if JSON encoding fails
pub fn inspect(log: &EventLog, step: Option<i64>, format: OutputFormat) -> Result<String> {
    let state = reconstruct(log.events(), step_or_last(log, step));
    match format {
        OutputFormat::Json => {
            let report = Inspection {
                run_id: log.run_id().to_string(),
                step_index: state.step_index(),
                max_step: log.max_step(),
                line: state.current_line(),
                state: &state,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
        OutputFormat::Text => Ok(inspect_text(log, &state)),
    }
}

fn inspect_text(log: &EventLog, state: &ProgramState) -> String {
    let mut out = String::new();
    let Some(step) = state.step_index() else {
        let _ = writeln!(out, "no events");
        return out;
    };

    let _ = writeln!(out, "step {step}/{}", log.max_step());
    if let Some(event) = &state.last_event {
        let _ = writeln!(
            out,
            "event {} in {} {} at line {}",
            event.kind.as_str(),
            event.function_name,
            event.frame_id,
            event.source_line
        );
        if let Some((kind, message)) = event.exception() {
            let _ = writeln!(out, "exception {kind}: {message}");
        }
    }

    let _ = writeln!(out, "frames {} ({} closed)", state.total_frames(), state.closed_count());
    for frame in state.frames.values() {
        let status = if frame.closed { "closed" } else { "open" };
        let _ = writeln!(
            out,
            "  {} {} depth {} {status}",
            frame.frame_id, frame.function_name, frame.depth
        );
        for (name, value) in &frame.locals {
            let _ = writeln!(out, "    {name} = {}", fmt_value(value));
        }
        if let Some(value) = &frame.return_value {
            let _ = writeln!(out, "    -> {}", fmt_value(value));
        }
    }

    if !state.stdout.is_empty() {
        let _ = writeln!(out, "stdout:");
        out.push_str(&state.stdout);
        if !state.stdout.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Render the call tree at a step, one frame per line
#[must_use]
pub fn tree(log: &EventLog, step: Option<i64>) -> String {
    let state = reconstruct(log.events(), step_or_last(log, step));
    let mut out = String::new();
    for node in state.call_tree().walk() {
        let Some(frame) = state.frame(node.frame_id) else {
            continue;
        };
        let _ = write!(
            out,
            "{}{} {}",
            "  ".repeat(node.level),
            frame.function_name,
            frame.frame_id
        );
        if frame.closed {
            match &frame.return_value {
                Some(value) => {
                    let _ = write!(out, " (returned: {})", fmt_value(value));
                }
                None => out.push_str(" (returned)"),
            }
        }
        out.push('\n');
    }
    out
}

/// One line of headless playback output
fn step_line(log: &EventLog, index: usize) -> Option<String> {
    let event = log.get(index)?;
    let mut line = format!(
        "[{index:>4}] {:<9} {} line {}",
        event.kind.as_str(),
        event.function_name,
        event.source_line
    );
    let out = event.stdout_fragment();
    if !out.is_empty() {
        let _ = write!(line, " | {}", out.trim_end_matches('\n'));
    }
    Some(line)
}

/// Play a log without a terminal UI, printing each step as it is reached
///
/// # Errors
///
/// Returns error if the playback task stops unexpectedly
pub async fn play_headless(log: EventLog, config: &AppConfig) -> Result<()> {
    let scheduler = PlaybackScheduler::new(log.clone(), config.playback.clone());
    let driver = PlaybackDriver::spawn(scheduler, config.tui.tick_rate());
    let mut snapshots = driver.subscribe();

    if let Some(line) = step_line(&log, 0) {
        println!("{line}");
    }
    if log.max_step() == 0 {
        driver.shutdown().await;
        return Ok(());
    }
    let mut printed = 0usize;

    driver.send(PlaybackCommand::Play).await?;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(step = printed, "playback interrupted");
                break;
            }
        }

        let snapshot = snapshots.borrow_and_update().clone();
        for index in printed + 1..=snapshot.cursor.step_index {
            if let Some(line) = step_line(&log, index) {
                println!("{line}");
            }
        }
        printed = printed.max(snapshot.cursor.step_index);

        if !snapshot.cursor.playing {
            break;
        }
    }

    driver.shutdown().await;
    Ok(())
}

/// Open the terminal player
///
/// # Errors
///
/// Returns error if the terminal cannot be driven
pub fn play_tui(log: EventLog, config: &AppConfig, autoplay: bool) -> Result<()> {
    let mut app = TuiApp::new(
        log,
        config.playback.clone(),
        config.replay.clone(),
        &config.tui,
    );
    if autoplay {
        app = app.autoplay();
    }
    app.run()?;
    Ok(())
}

/// Options for `run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions<'a> {
    /// Input lines for the program, as raw text
    pub stdin: Option<&'a Path>,
    /// Where to write the trace
    pub save: Option<&'a Path>,
}

/// Run a program through the interpreter and return its trace
///
/// # Errors
///
/// Returns error if the interpreter cannot start, the run fails or the
/// trace cannot be saved
pub async fn run_program(source: &Path, options: RunOptions<'_>, config: &AppConfig) -> Result<EventLog> {
    let source_code = std::fs::read_to_string(source)
        .wrap_err_with(|| format!("cannot read program {}", source.display()))?;
    let stdin = match options.stdin {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read input {}", path.display()))?,
        None => String::new(),
    };

    let session = Session::new(ProcessInterpreter::new(config.sandbox.clone()));
    session
        .start()
        .await
        .wrap_err_with(|| format!("cannot start interpreter {}", config.sandbox.program))?;

    let result = session
        .run(RunRequest::with_stdin_text(source_code, &stdin))
        .await;
    if let Err(err) = session.stop().await {
        tracing::warn!(error = %err, "interpreter did not stop cleanly");
    }
    let log = result.wrap_err("run failed")?;

    if let Some(path) = options.save {
        let json = log.to_payload().to_json_pretty()?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("cannot write trace {}", path.display()))?;
        tracing::info!(path = %path.display(), "trace saved");
    }
    Ok(log)
}

/// One-paragraph summary of a finished run
#[must_use]
pub fn run_summary(log: &EventLog) -> String {
    let state = reconstruct(log.events(), i64::try_from(log.max_step()).unwrap_or(i64::MAX));
    let mut out = format!(
        "{} events, {} frames\n",
        log.len(),
        state.total_frames()
    );
    if let Some((kind, message)) = state.last_event.as_ref().and_then(|e| e.exception()) {
        let _ = writeln!(out, "raised {kind}: {message}");
    }
    out.push_str(&state.stdout);
    out
}
