//! Differences between two reconstructed states.
//!
//! Used to show what a single step did: which frames appeared or returned,
//! which locals changed, and what was printed.

use crate::state::{Frame, ProgramState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracescope_core::FrameId;

/// Change to one local variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChange {
    /// Frame owning the local
    pub frame_id: FrameId,
    /// Variable name
    pub name: String,
    /// Value before, if the name was bound
    pub old: Option<Value>,
    /// Value after
    pub new: Value,
}

/// What changed between an earlier and a later state of the same log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDiff {
    /// Frames present only in the later state
    pub frames_created: Vec<FrameId>,
    /// Frames closed in the later state but open (or absent) in the earlier
    pub frames_closed: Vec<FrameId>,
    /// Locals added or rebound
    pub locals_changed: Vec<LocalChange>,
    /// Output printed in between
    pub stdout_appended: String,
}

impl StepDiff {
    /// Create an empty diff
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the diff from `before` to `after`
    ///
    /// `before` is expected to be a prefix fold of `after`. If it is not,
    /// the output section reports the whole of `after.stdout`.
    #[must_use]
    pub fn compute(before: &ProgramState, after: &ProgramState) -> Self {
        let mut diff = Self::new();

        for frame in after.frames.values() {
            diff.record_frame(before.frame(frame.frame_id), frame);
        }

        diff.stdout_appended = after
            .stdout
            .strip_prefix(before.stdout.as_str())
            .unwrap_or(&after.stdout)
            .to_string();

        diff
    }

    /// Diff of the last event folded into `after`
    ///
    /// An event only touches its own frame, so only that frame's earlier
    /// version (`prior`, `None` if it did not exist yet) and the output
    /// length before the event are needed. Agrees with [`StepDiff::compute`]
    /// against the state one step earlier.
    #[must_use]
    pub fn from_last_event(prior: Option<&Frame>, stdout_before: usize, after: &ProgramState) -> Self {
        let mut diff = Self::new();
        let Some(event) = &after.last_event else {
            return diff;
        };
        if let Some(frame) = after.frame(event.frame_id) {
            diff.record_frame(prior, frame);
        }
        diff.stdout_appended = after.stdout.get(stdout_before..).unwrap_or_default().to_string();
        diff
    }

    fn record_frame(&mut self, prior: Option<&Frame>, frame: &Frame) {
        if prior.is_none() {
            self.frames_created.push(frame.frame_id);
        }
        if frame.closed && !prior.is_some_and(|p| p.closed) {
            self.frames_closed.push(frame.frame_id);
        }

        for (name, value) in &frame.locals {
            let old = prior.and_then(|p| p.locals.get(name));
            if old != Some(value) {
                self.locals_changed.push(LocalChange {
                    frame_id: frame.frame_id,
                    name: name.clone(),
                    old: old.cloned(),
                    new: value.clone(),
                });
            }
        }
    }

    /// Whether anything changed
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.frames_created.is_empty()
            || !self.frames_closed.is_empty()
            || !self.locals_changed.is_empty()
            || !self.stdout_appended.is_empty()
    }

    /// Whether a given local changed
    #[must_use]
    pub fn local_changed(&self, frame_id: FrameId, name: &str) -> bool {
        self.locals_changed
            .iter()
            .any(|c| c.frame_id == frame_id && c.name == name)
    }

    /// Merge a later diff into this one
    pub fn merge(&mut self, other: StepDiff) {
        self.frames_created.extend(other.frames_created);
        self.frames_closed.extend(other.frames_closed);
        for change in other.locals_changed {
            match self
                .locals_changed
                .iter_mut()
                .find(|c| c.frame_id == change.frame_id && c.name == change.name)
            {
                Some(existing) => existing.new = change.new,
                None => self.locals_changed.push(change),
            }
        }
        self.stdout_appended.push_str(&other.stdout_appended);
    }
}
