//! tracescope core types
//!
//! This crate contains pure types with no I/O: identifiers for frames and
//! runs, the time units recorded by the tracer, and the shared error type.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod time;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{FrameId, RunId};
pub use time::{TraceDelta, TraceInstant};
