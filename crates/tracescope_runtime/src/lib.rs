//! tracescope playback runtime
//!
//! Cursor, wall-clock scheduler and the async driver that runs it.
//! The scheduler is the single owner of the cursor; reconstruction is
//! never done here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod cursor;
pub mod driver;
pub mod scheduler;

pub use config::PlaybackConfig;
pub use cursor::PlaybackCursor;
pub use driver::{DriverError, PlaybackCommand, PlaybackDriver, PlaybackSnapshot};
pub use scheduler::{PlaybackScheduler, TickOutcome};
