//! Interpreter process configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How to launch the interpreter process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Executable to spawn
    pub program: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// How long to wait for the ready message, in milliseconds
    pub init_timeout_ms: u64,
    /// How long to wait for a run to finish, in milliseconds
    pub run_timeout_ms: u64,
}

impl SandboxConfig {
    /// Create a new config for a program
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Set the arguments
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the init timeout
    #[must_use]
    pub fn with_init_timeout_ms(mut self, ms: u64) -> Self {
        self.init_timeout_ms = ms;
        self
    }

    /// Set the run timeout
    #[must_use]
    pub fn with_run_timeout_ms(mut self, ms: u64) -> Self {
        self.run_timeout_ms = ms;
        self
    }

    /// Init timeout as a duration
    #[must_use]
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// Run timeout as a duration
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            program: "tracescope-interpreter".to_string(),
            args: Vec::new(),
            init_timeout_ms: 30_000,
            run_timeout_ms: 10_000,
        }
    }
}
