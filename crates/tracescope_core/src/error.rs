//! Core error types for tracescope.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Input was not valid JSON or did not match the expected shape
    ParseError {
        /// Decoder message
        message: String,
    },

    /// Steps in a trace went backwards
    StepOrder {
        /// Position in the log where the violation was found
        position: usize,
        /// Step number of the previous event
        previous: u64,
        /// Step number of the offending event
        found: u64,
    },

    /// I/O failure (file or pipe)
    Io {
        /// Error message
        message: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { message } => write!(f, "Parse error: {}", message),
            Self::StepOrder {
                position,
                previous,
                found,
            } => write!(
                f,
                "Step order violated at position {}: step {} follows step {}",
                position, found, previous
            ),
            Self::Io { message } => write!(f, "I/O error: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Io {
            message: "pipe closed".to_string(),
        };
        assert_eq!(format!("{}", err), "I/O error: pipe closed");
    }

    #[test]
    fn test_step_order_error() {
        let err = CoreError::StepOrder {
            position: 3,
            previous: 5,
            found: 4,
        };
        let s = format!("{}", err);
        assert!(s.contains("position 3"));
        assert!(s.contains("step 4 follows step 5"));
    }

    #[test]
    fn test_from_serde_json() {
        let parsed: Result<u64, _> = serde_json::from_str("not json");
        let err: CoreError = parsed.unwrap_err().into();
        assert!(matches!(err, CoreError::ParseError { .. }));
    }

    #[test]
    fn test_from_io() {
        let err: CoreError = std::io::Error::other("gone").into();
        assert_eq!(
            err,
            CoreError::Io {
                message: "gone".to_string()
            }
        );
    }
}
