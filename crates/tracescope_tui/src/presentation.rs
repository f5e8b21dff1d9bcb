//! View models projected from reconstructed state.
//!
//! Nothing here folds events. A [`PlayerView`] is rebuilt from a
//! [`ProgramState`], the cursor and the step diff every time the screen is
//! drawn, so it can be thrown away and regenerated freely.

use serde::Serialize;
use serde_json::Value;
use tracescope_core::FrameId;
use tracescope_log::EventLog;
use tracescope_replay::{ProgramState, StepDiff};
use tracescope_runtime::PlaybackCursor;

/// Render a value as compact JSON
#[must_use]
pub fn fmt_value(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Frames in tab order: by depth, then id
#[must_use]
pub fn frame_order(state: &ProgramState) -> Vec<FrameId> {
    let mut frames: Vec<_> = state.frames.values().collect();
    frames.sort_by_key(|frame| (frame.depth, frame.frame_id));
    frames.into_iter().map(|frame| frame.frame_id).collect()
}

/// Which frame's locals are shown
///
/// The selection follows the frame of the last event every time the cursor
/// moves. Picking another frame holds until the next move; pinning holds it
/// until unpinned or until the frame no longer exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSelection {
    selected: Option<FrameId>,
    pinned: bool,
}

impl FrameSelection {
    /// Empty selection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected frame as last set
    #[must_use]
    pub fn selected(&self) -> Option<FrameId> {
        self.selected
    }

    /// Whether the selection is pinned
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Cursor moved: follow the last event unless pinned
    pub fn follow(&mut self, state: &ProgramState) {
        if self.pinned && self.resolve_pinned(state).is_some() {
            return;
        }
        self.pinned = false;
        if let Some(event) = &state.last_event {
            self.selected = Some(event.frame_id);
        }
    }

    /// Select a frame until the cursor next moves
    pub fn select(&mut self, frame_id: FrameId) {
        self.selected = Some(frame_id);
    }

    /// Pin the current selection
    pub fn pin(&mut self) {
        self.pinned = self.selected.is_some();
    }

    /// Drop the pin; the selection follows again on the next move
    pub fn unpin(&mut self) {
        self.pinned = false;
    }

    /// Forget everything (new log loaded)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Frame to display for this state, if it exists there
    #[must_use]
    pub fn resolve(&self, state: &ProgramState) -> Option<FrameId> {
        self.selected.filter(|id| state.frames.contains_key(id))
    }

    fn resolve_pinned(&self, state: &ProgramState) -> Option<FrameId> {
        if self.pinned { self.resolve(state) } else { None }
    }

    /// Select the next frame in tab order, wrapping around
    pub fn select_next(&mut self, state: &ProgramState) {
        self.cycle(state, 1);
    }

    /// Select the previous frame in tab order, wrapping around
    pub fn select_prev(&mut self, state: &ProgramState) {
        self.cycle(state, -1);
    }

    fn cycle(&mut self, state: &ProgramState, delta: isize) {
        let order = frame_order(state);
        if order.is_empty() {
            return;
        }
        let len = order.len() as isize;
        let next = match self.resolve(state).and_then(|id| order.iter().position(|f| *f == id)) {
            Some(pos) => (pos as isize + delta).rem_euclid(len),
            None if delta >= 0 => 0,
            None => len - 1,
        };
        self.selected = Some(order[next as usize]);
    }
}

/// One numbered source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    /// 1-based line number
    pub number: u32,
    /// Line text without terminator
    pub text: String,
    /// Whether the last event ran this line
    pub highlighted: bool,
}

/// One row of the flattened call tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    /// Frame shown on this row
    pub frame_id: FrameId,
    /// Nesting level (roots are 0)
    pub level: usize,
    /// Function name
    pub function_name: String,
    /// Whether the frame has returned
    pub closed: bool,
    /// Formatted return value, if any
    pub return_value: Option<String>,
    /// Whether this is the selected frame
    pub selected: bool,
}

impl TreeRow {
    /// Display label, e.g. `add #2 (returned: 3)`
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = format!("{} {}", self.function_name, self.frame_id);
        if self.closed {
            match &self.return_value {
                Some(value) => label.push_str(&format!(" (returned: {value})")),
                None => label.push_str(" (returned)"),
            }
        }
        label
    }
}

/// One frame tab above the locals table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameTab {
    /// Frame ID
    pub frame_id: FrameId,
    /// Function name
    pub function_name: String,
    /// Call depth
    pub depth: u32,
    /// Whether the frame has returned
    pub closed: bool,
    /// Whether this tab is selected
    pub selected: bool,
}

/// One local variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalRow {
    /// Variable name
    pub name: String,
    /// Compact JSON value
    pub value: String,
    /// Whether the last step changed it
    pub changed: bool,
}

/// Locals of the selected frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalsTable {
    /// Frame the rows belong to
    pub frame_id: Option<FrameId>,
    /// Function name of that frame
    pub function_name: String,
    /// Rows in assignment order
    pub rows: Vec<LocalRow>,
}

impl LocalsTable {
    fn build(state: &ProgramState, frame_id: Option<FrameId>, diff: &StepDiff) -> Self {
        let Some(frame) = frame_id.and_then(|id| state.frame(id)) else {
            return Self::default();
        };
        let rows = frame
            .locals
            .iter()
            .map(|(name, value)| LocalRow {
                name: name.clone(),
                value: fmt_value(value),
                changed: diff.local_changed(frame.frame_id, name),
            })
            .collect();
        Self {
            frame_id: Some(frame.frame_id),
            function_name: frame.function_name.clone(),
            rows,
        }
    }

    /// Whether there is nothing to show
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Status bar contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    /// Current step index
    pub step_index: usize,
    /// Last valid step index
    pub max_step: usize,
    /// Whether playback is running
    pub playing: bool,
    /// Playback speed
    pub speed: f64,
    /// Kind of the last event
    pub event: Option<String>,
    /// Function of the last event
    pub function_name: Option<String>,
    /// Line of the last event
    pub line: Option<u32>,
    /// Frame of the last event
    pub frame_id: Option<FrameId>,
    /// Exception type and message, when the last event raised
    pub exception: Option<(String, String)>,
}

impl StatusLine {
    /// One-line summary of the current step
    #[must_use]
    pub fn summary(&self) -> String {
        let state = if self.playing { "playing" } else { "paused" };
        let mut text = format!(
            "step {}/{} | {} | {}x",
            self.step_index, self.max_step, state, self.speed
        );
        if let (Some(event), Some(line), Some(fid)) = (&self.event, self.line, self.frame_id) {
            let func = self.function_name.as_deref().unwrap_or("");
            text.push_str(&format!(" | {event} {func} line {line} {fid}"));
        }
        if let Some((kind, message)) = &self.exception {
            text.push_str(&format!(" | {kind}: {message}"));
        }
        text
    }
}

/// Everything the player draws for one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    /// File name of the run
    pub filename: String,
    /// Numbered source with the current line flagged
    pub source: Vec<SourceLine>,
    /// Flattened call tree in pre-order
    pub tree: Vec<TreeRow>,
    /// Frame tabs in (depth, id) order
    pub tabs: Vec<FrameTab>,
    /// Locals of the selected frame
    pub locals: LocalsTable,
    /// Output so far
    pub stdout: String,
    /// Status bar
    pub status: StatusLine,
}

impl PlayerView {
    /// Project state at the cursor into view models
    ///
    /// `diff` is the change from the previous step to this one; it only
    /// drives the changed markers in the locals table.
    #[must_use]
    pub fn build(
        log: &EventLog,
        state: &ProgramState,
        cursor: &PlaybackCursor,
        diff: &StepDiff,
        selection: &FrameSelection,
    ) -> Self {
        let current_line = state.current_line();
        let selected = selection.resolve(state);

        let source = log
            .source_lines()
            .into_iter()
            .zip(1u32..)
            .map(|(text, number)| SourceLine {
                number,
                text: text.to_string(),
                highlighted: current_line == Some(number),
            })
            .collect();

        let tree = state
            .call_tree()
            .walk()
            .into_iter()
            .filter_map(|node| {
                let frame = state.frame(node.frame_id)?;
                Some(TreeRow {
                    frame_id: frame.frame_id,
                    level: node.level,
                    function_name: frame.function_name.clone(),
                    closed: frame.closed,
                    return_value: frame.return_value.as_ref().map(fmt_value),
                    selected: selected == Some(frame.frame_id),
                })
            })
            .collect();

        let tabs = frame_order(state)
            .into_iter()
            .filter_map(|id| state.frame(id))
            .map(|frame| FrameTab {
                frame_id: frame.frame_id,
                function_name: frame.function_name.clone(),
                depth: frame.depth,
                closed: frame.closed,
                selected: selected == Some(frame.frame_id),
            })
            .collect();

        let last = state.last_event.as_ref();
        let status = StatusLine {
            step_index: cursor.step_index,
            max_step: log.max_step(),
            playing: cursor.playing,
            speed: cursor.speed,
            event: last.map(|e| e.kind.as_str().to_string()),
            function_name: last.map(|e| e.function_name.clone()),
            line: last.map(|e| e.source_line),
            frame_id: last.map(|e| e.frame_id),
            exception: last.and_then(|e| e.exception()),
        };

        Self {
            filename: log.filename().to_string(),
            source,
            tree,
            tabs,
            locals: LocalsTable::build(state, selected, diff),
            stdout: state.stdout.clone(),
            status,
        }
    }

    /// Index of the highlighted source line in [`PlayerView::source`]
    #[must_use]
    pub fn highlighted_index(&self) -> Option<usize> {
        self.source.iter().position(|line| line.highlighted)
    }
}
