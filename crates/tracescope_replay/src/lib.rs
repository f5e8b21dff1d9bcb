//! tracescope replay engine
//!
//! Deterministic reconstruction of program state (frames, locals, output)
//! at any step of an execution log, plus the call-tree view and per-step
//! diffs built on top of it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod engine;
pub mod snapshot;
pub mod state;
pub mod tree;

pub use diff::{LocalChange, StepDiff};
pub use engine::{reconstruct, reconstruct_at, reconstruct_prefix, ReplayConfig, ReplayEngine, ReplayStats};
pub use snapshot::SnapshotStore;
pub use state::{Frame, ProgramState};
pub use tree::{CallTree, TreeNode};
