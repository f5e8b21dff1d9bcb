//! tracescope event log
//!
//! The immutable, ordered record of one program run as produced by the
//! instrumented interpreter, and the payload envelope it arrives in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod log;
pub mod payload;

pub use event::{Event, EventKind, Locals};
pub use log::EventLog;
pub use payload::TracePayload;
