//! Application configuration file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracescope_replay::ReplayConfig;
use tracescope_runtime::PlaybackConfig;
use tracescope_sandbox::SandboxConfig;
use tracescope_tui::TuiConfig;

/// Everything the binary can be configured with
///
/// Every section is optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Playback pacing and speed limits
    pub playback: PlaybackConfig,
    /// Reconstruction checkpoints
    pub replay: ReplayConfig,
    /// Interpreter process
    pub sandbox: SandboxConfig,
    /// Terminal player
    pub tui: TuiConfig,
}

impl AppConfig {
    /// Read a JSON config file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Read the file if one was given, otherwise use defaults
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::load`]
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Override the interpreter program
    #[must_use]
    pub fn with_interpreter(mut self, program: Option<String>) -> Self {
        if let Some(program) = program {
            self.sandbox.program = program;
        }
        self
    }

    /// Override the starting speed
    #[must_use]
    pub fn with_speed(mut self, speed: Option<f64>) -> Self {
        if let Some(speed) = speed {
            self.playback = self.playback.with_default_speed(speed);
        }
        self
    }
}

/// Config loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The file is not a valid config
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}
