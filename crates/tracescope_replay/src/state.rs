//! Reconstructed program state.

use crate::tree::CallTree;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracescope_core::FrameId;
use tracescope_log::{Event, Locals};

/// Program state after folding a prefix of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramState {
    /// Output accumulated so far
    pub stdout: String,
    /// Every frame seen so far, keyed by id
    pub frames: BTreeMap<FrameId, Frame>,
    /// Last event folded in
    pub last_event: Option<Event>,
    /// Number of events folded in
    pub events_applied: usize,
}

/// One call-stack activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame ID
    pub frame_id: FrameId,
    /// Function name
    pub function_name: String,
    /// Call-stack depth
    pub depth: u32,
    /// Parent frame as recorded by the tracer
    pub parent_frame_id: Option<FrameId>,
    /// Current locals
    pub locals: Locals,
    /// Whether a return has been seen
    pub closed: bool,
    /// Value returned on close
    pub return_value: Option<Value>,
    /// Step index of the event that created this frame
    pub created_at: usize,
    /// Step index of the event that closed this frame
    pub closed_at: Option<usize>,
}

impl ProgramState {
    /// Create an empty state (no events applied)
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: String::new(),
            frames: BTreeMap::new(),
            last_event: None,
            events_applied: 0,
        }
    }

    /// Fold the next event into the state
    ///
    /// Events must be applied in log order; `index` is the event's position
    /// in the log and must equal [`ProgramState::events_applied`].
    pub fn apply(&mut self, index: usize, event: &Event) {
        debug_assert_eq!(index, self.events_applied, "events applied out of order");

        self.stdout.push_str(event.stdout_fragment());

        let frame = self
            .frames
            .entry(event.frame_id)
            .or_insert_with(|| Frame::open(index, event));

        if let Some(assignments) = &event.assignments {
            for (name, value) in assignments {
                frame.locals.insert(name.clone(), value.clone());
            }
        }

        if event.kind.closes_frame() {
            frame.close(index, event.return_value.as_ref());
        }

        self.last_event = Some(event.clone());
        self.events_applied = index + 1;
    }

    /// Step index of the last applied event
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        self.events_applied.checked_sub(1)
    }

    /// Whether no events have been applied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events_applied == 0
    }

    /// Get a frame
    #[must_use]
    pub fn frame(&self, frame_id: FrameId) -> Option<&Frame> {
        self.frames.get(&frame_id)
    }

    /// Frame the last event ran in
    #[must_use]
    pub fn current_frame(&self) -> Option<&Frame> {
        self.last_event
            .as_ref()
            .and_then(|event| self.frames.get(&event.frame_id))
    }

    /// Frames that have not returned yet, in id order
    #[must_use]
    pub fn open_frames(&self) -> Vec<&Frame> {
        self.frames.values().filter(|f| !f.closed).collect()
    }

    /// Total frame count
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    /// Closed frame count
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.frames.values().filter(|f| f.closed).count()
    }

    /// Source line of the last event
    #[must_use]
    pub fn current_line(&self) -> Option<u32> {
        self.last_event.as_ref().map(|e| e.source_line)
    }

    /// Forest view over the frames
    #[must_use]
    pub fn call_tree(&self) -> CallTree {
        CallTree::build(&self.frames)
    }
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Materialize a frame from the first event that mentions it
    fn open(index: usize, event: &Event) -> Self {
        Self {
            frame_id: event.frame_id,
            function_name: event.function_name.clone(),
            depth: event.depth,
            parent_frame_id: event.parent_frame_id,
            locals: event.args.clone().unwrap_or_default(),
            closed: false,
            return_value: None,
            created_at: index,
            closed_at: None,
        }
    }

    /// Mark closed; only the first close records a value
    fn close(&mut self, index: usize, value: Option<&Value>) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.closed_at = Some(index);
        self.return_value = value.cloned();
    }

    /// Whether this frame has no recorded parent
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_frame_id.is_none()
    }

    /// Get a local
    #[must_use]
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracescope_log::EventKind;

    #[test]
    fn test_program_state_new() {
        let state = ProgramState::new();
        assert!(state.is_empty());
        assert_eq!(state.step_index(), None);
        assert_eq!(state.total_frames(), 0);
        assert!(state.current_frame().is_none());
    }

    #[test]
    fn test_apply_creates_frame_with_args() {
        let mut state = ProgramState::new();
        let call = Event::new(0, EventKind::Call, 1u64)
            .with_function("main")
            .with_args([("n", json!(3))]);
        state.apply(0, &call);

        let frame = state.frame(FrameId::from_raw(1)).unwrap();
        assert_eq!(frame.function_name, "main");
        assert_eq!(frame.local("n"), Some(&json!(3)));
        assert!(frame.is_root());
        assert_eq!(state.step_index(), Some(0));
    }

    #[test]
    fn test_assignments_override_and_keep() {
        let mut state = ProgramState::new();
        state.apply(0, &Event::new(0, EventKind::Call, 1u64).with_args([("a", json!(1))]));
        state.apply(
            1,
            &Event::new(1, EventKind::Line, 1u64).with_assignments([("b", json!(2))]),
        );
        state.apply(
            2,
            &Event::new(2, EventKind::Line, 1u64).with_assignments([("a", json!(9))]),
        );

        let frame = state.frame(FrameId::from_raw(1)).unwrap();
        assert_eq!(frame.local("a"), Some(&json!(9)));
        assert_eq!(frame.local("b"), Some(&json!(2)));
        let names: Vec<&str> = frame.locals.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_return_closes_once() {
        let mut state = ProgramState::new();
        state.apply(0, &Event::new(0, EventKind::Call, 1u64));
        state.apply(1, &Event::new(1, EventKind::Return, 1u64).with_return(json!(1)));
        state.apply(2, &Event::new(2, EventKind::Return, 1u64).with_return(json!(2)));

        let frame = state.frame(FrameId::from_raw(1)).unwrap();
        assert!(frame.closed);
        assert_eq!(frame.return_value, Some(json!(1)));
        assert_eq!(frame.closed_at, Some(1));
    }

    #[test]
    fn test_unknown_kind_is_bookkept() {
        let mut state = ProgramState::new();
        let odd = Event::new(0, EventKind::from("Yield"), 4u64)
            .with_stdout("x")
            .with_assignments([("v", json!(true))]);
        state.apply(0, &odd);

        assert_eq!(state.stdout, "x");
        let frame = state.frame(FrameId::from_raw(4)).unwrap();
        assert!(!frame.closed);
        assert_eq!(frame.local("v"), Some(&json!(true)));
    }

    #[test]
    fn test_open_frames() {
        let mut state = ProgramState::new();
        state.apply(0, &Event::new(0, EventKind::Call, 1u64));
        state.apply(1, &Event::new(1, EventKind::Call, 2u64).with_parent(1u64, 1));
        state.apply(2, &Event::new(2, EventKind::Return, 2u64));

        let open: Vec<FrameId> = state.open_frames().iter().map(|f| f.frame_id).collect();
        assert_eq!(open, vec![FrameId::from_raw(1)]);
        assert_eq!(state.closed_count(), 1);
        assert_eq!(state.current_frame().map(|f| f.frame_id), Some(FrameId::from_raw(2)));
    }
}
