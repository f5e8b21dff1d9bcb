//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `--log-level` nor `RUST_LOG` is set
pub const DEFAULT_FILTER: &str = "tracescope=info";

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget<'a> {
    /// Standard error
    Stderr,
    /// Append to a file
    File(&'a Path),
    /// Nowhere
    Off,
}

impl<'a> LogTarget<'a> {
    /// Pick a target; full-screen commands must not write to the terminal
    #[must_use]
    pub fn select(log_file: Option<&'a Path>, full_screen: bool) -> Self {
        match (log_file, full_screen) {
            (Some(path), _) => Self::File(path),
            (None, true) => Self::Off,
            (None, false) => Self::Stderr,
        }
    }
}

/// Build the filter: an explicit level wins over `RUST_LOG`
#[must_use]
pub fn filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(format!("tracescope={level}"))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns error if the log file cannot be opened
pub fn init(level: Option<&str>, target: LogTarget<'_>) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter(level));
    match target {
        LogTarget::Off => {}
        LogTarget::Stderr => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
    }
    Ok(())
}
