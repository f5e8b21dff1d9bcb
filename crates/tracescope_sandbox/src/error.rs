//! Interpreter errors.

use tracescope_core::CoreError;

/// Errors surfaced by the interpreter boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// The interpreter could not be started or did not become ready
    #[error("Interpreter failed to start: {reason}")]
    InterpreterInitFailed {
        /// What went wrong
        reason: String,
    },

    /// A run was requested while another was still executing
    #[error("A run is already in progress. Please wait.")]
    RunRejectedBusy,

    /// The program raised or the interpreter reported a failure
    #[error("Run failed: {message}")]
    RunFailed {
        /// Message from the interpreter
        message: String,
    },

    /// The response was not a valid trace
    #[error("Malformed trace: {reason}")]
    MalformedTrace {
        /// Decode or validation failure
        reason: String,
    },

    /// `run` was called before a successful `start`
    #[error("Interpreter not initialized yet. Call start first.")]
    NotStarted,

    /// Pipe or process I/O failed
    #[error("Interpreter I/O error: {0}")]
    Io(String),
}

impl SandboxError {
    /// Whether this is a failed run as far as the user is concerned
    ///
    /// A malformed trace is reported the same way as a failed run.
    #[must_use]
    pub fn is_run_failure(&self) -> bool {
        matches!(self, Self::RunFailed { .. } | Self::MalformedTrace { .. })
    }

    /// Whether retrying later could succeed without restarting
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RunRejectedBusy)
    }
}

impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<CoreError> for SandboxError {
    fn from(err: CoreError) -> Self {
        Self::MalformedTrace {
            reason: err.to_string(),
        }
    }
}
