//! Message protocol spoken with the interpreter process.
//!
//! One JSON object per line in each direction, tagged by `type`.

use crate::error::SandboxError;
use serde::{Deserialize, Serialize};
use tracescope_log::TracePayload;

/// A program to run and the input it will read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Program source text
    pub source_code: String,
    /// Lines handed to the program's input calls, in order
    pub stdin_lines: Vec<String>,
}

impl RunRequest {
    /// Create a request
    #[must_use]
    pub fn new(source_code: impl Into<String>, stdin_lines: Vec<String>) -> Self {
        Self {
            source_code: source_code.into(),
            stdin_lines,
        }
    }

    /// Create a request, splitting raw input text into lines
    ///
    /// Empty text means no input lines.
    #[must_use]
    pub fn with_stdin_text(source_code: impl Into<String>, stdin: &str) -> Self {
        let stdin_lines = if stdin.is_empty() {
            Vec::new()
        } else {
            TracePayload::split_lines(stdin)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self::new(source_code, stdin_lines)
    }
}

/// Requests sent to the interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    /// Load the tracer and report readiness
    Init,
    /// Run a program
    Run(RunRequest),
}

/// Responses read from the interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    /// Ready to accept runs
    #[serde(alias = "initialized")]
    Ready,
    /// A finished run
    Trace {
        /// Undecoded trace payload
        payload: serde_json::Value,
    },
    /// Init or run failure
    Error {
        /// Message from the interpreter
        #[serde(default)]
        message: String,
    },
}

impl Request {
    /// Encode as one protocol line (newline included)
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Io`] if encoding fails
    pub fn to_line(&self) -> Result<String, SandboxError> {
        let mut line =
            serde_json::to_string(self).map_err(|err| SandboxError::Io(err.to_string()))?;
        line.push('\n');
        Ok(line)
    }
}

impl Response {
    /// Decode one protocol line
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::MalformedTrace`] if the line is not a response
    pub fn from_line(line: &str) -> Result<Self, SandboxError> {
        serde_json::from_str(line.trim()).map_err(|err| SandboxError::MalformedTrace {
            reason: format!("unreadable interpreter response: {err}"),
        })
    }

    /// Turn a run response into a decoded payload
    ///
    /// # Errors
    ///
    /// - [`SandboxError::RunFailed`] for an error response
    /// - [`SandboxError::MalformedTrace`] for an invalid payload or a response
    ///   that is not a run result
    pub fn into_payload(self) -> Result<TracePayload, SandboxError> {
        match self {
            Self::Trace { payload } => Ok(TracePayload::from_value(payload)?),
            Self::Error { message } => Err(SandboxError::RunFailed { message }),
            Self::Ready => Err(SandboxError::MalformedTrace {
                reason: "expected a trace, got a ready message".to_string(),
            }),
        }
    }

    /// Interpret an init response
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InterpreterInitFailed`] unless the response is `ready`
    pub fn into_ready(self) -> Result<(), SandboxError> {
        match self {
            Self::Ready => Ok(()),
            Self::Error { message } => Err(SandboxError::InterpreterInitFailed { reason: message }),
            Self::Trace { .. } => Err(SandboxError::InterpreterInitFailed {
                reason: "expected ready, got a trace".to_string(),
            }),
        }
    }
}
