//! Trace payload envelope and decoding.

use crate::event::Event;
use serde::{Deserialize, Serialize};
use tracescope_core::{CoreError, CoreResult};

/// What the interpreter hands back for one successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePayload {
    /// File name the program ran as
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Program source text
    #[serde(rename = "code", alias = "sourceCode", default)]
    pub source_code: String,
    /// Events in log order
    #[serde(rename = "trace", alias = "events", default)]
    pub events: Vec<Event>,
}

fn default_filename() -> String {
    TracePayload::DEFAULT_FILENAME.to_string()
}

impl TracePayload {
    /// File name used when the producer does not send one
    pub const DEFAULT_FILENAME: &'static str = "<user_code>";

    /// Decode and validate a payload from JSON text
    ///
    /// A bare JSON array is accepted as the event list of a payload with no
    /// source attached.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ParseError`] if the text is not a payload and
    /// [`CoreError::StepOrder`] if steps go backwards.
    pub fn from_json(text: &str) -> CoreResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode and validate a payload from a JSON value
    ///
    /// # Errors
    ///
    /// Same as [`TracePayload::from_json`].
    pub fn from_value(value: serde_json::Value) -> CoreResult<Self> {
        let payload = match value {
            serde_json::Value::Array(_) => Self {
                filename: default_filename(),
                source_code: String::new(),
                events: serde_json::from_value(value)?,
            },
            serde_json::Value::Object(_) => serde_json::from_value(value)?,
            other => {
                return Err(CoreError::ParseError {
                    message: format!("expected a trace object or array, got {}", kind_of(&other)),
                });
            }
        };
        payload.validate()?;
        tracing::debug!(
            filename = %payload.filename,
            events = payload.events.len(),
            "trace payload decoded"
        );
        Ok(payload)
    }

    /// Check that steps never decrease
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StepOrder`] at the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        for (position, pair) in self.events.windows(2).enumerate() {
            if pair[1].step < pair[0].step {
                return Err(CoreError::StepOrder {
                    position: position + 1,
                    previous: pair[0].step,
                    found: pair[1].step,
                });
            }
        }
        Ok(())
    }

    /// Encode to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Source split into lines
    #[must_use]
    pub fn source_lines(&self) -> Vec<&str> {
        Self::split_lines(&self.source_code)
    }

    /// Split text into lines the way the code view numbers them
    ///
    /// Unlike [`str::lines`], a trailing newline yields a final empty line,
    /// and `\r\n` is treated as a single break.
    #[must_use]
    pub fn split_lines(text: &str) -> Vec<&str> {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect()
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
