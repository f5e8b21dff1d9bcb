//! Event types for the execution log.
//!
//! Field names on the wire follow the tracer (`fid`, `set`, `out+`, ...);
//! the long-form names are accepted as aliases. Keys the tracer adds that
//! this crate does not model are preserved in [`Event::extra`].

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracescope_core::{FrameId, TraceDelta, TraceInstant};

/// Local variable bindings, in insertion order
pub type Locals = IndexMap<String, Value>;

/// Event kind - what the interpreter was doing at this step
///
/// Unrecognized kinds are kept verbatim so newer tracers stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// A function frame was entered
    Call,
    /// A source line is about to execute
    Line,
    /// A function frame returned
    Return,
    /// The program read a line of input
    Input,
    /// An exception was raised in the frame
    Exception,
    /// Any kind this build does not know about
    Unknown(String),
}

impl EventKind {
    /// Wire name of the kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Call => "Call",
            Self::Line => "Line",
            Self::Return => "Return",
            Self::Input => "Input",
            Self::Exception => "Exception",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether this kind closes its frame
    #[must_use]
    pub fn closes_frame(&self) -> bool {
        matches!(self, Self::Return)
    }

    /// Whether the kind is one this build recognizes
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        const KNOWN: [(&str, EventKind); 5] = [
            ("Call", EventKind::Call),
            ("Line", EventKind::Line),
            ("Return", EventKind::Return),
            ("Input", EventKind::Input),
            ("Exception", EventKind::Exception),
        ];
        KNOWN
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&raw))
            .map(|(_, kind)| kind)
            .unwrap_or(EventKind::Unknown(raw))
    }
}

impl From<&str> for EventKind {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the execution log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Producer-assigned step number
    pub step: u64,
    /// Absolute tracer timestamp
    #[serde(rename = "ts", alias = "timestamp", default)]
    pub timestamp: TraceInstant,
    /// Time since the previous event; paces playback only
    #[serde(rename = "dt", alias = "deltaTime", default)]
    pub delta_time: TraceDelta,
    /// Event kind
    #[serde(rename = "event", alias = "kind")]
    pub kind: EventKind,
    /// Name of the executing function
    #[serde(rename = "func", alias = "functionName", default)]
    pub function_name: String,
    /// 1-based source line
    #[serde(rename = "line", alias = "sourceLine", default)]
    pub source_line: u32,
    /// Frame this event belongs to
    #[serde(rename = "fid", alias = "frameId")]
    pub frame_id: FrameId,
    /// Parent frame, `None` for a root frame
    #[serde(rename = "parent", alias = "parentFrameId", default)]
    pub parent_frame_id: Option<FrameId>,
    /// Call-stack depth, root = 0
    #[serde(default)]
    pub depth: u32,
    /// Initial locals at call time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Locals>,
    /// Local updates made at this step
    #[serde(
        rename = "set",
        alias = "assignments",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assignments: Option<Locals>,
    /// Values the updated locals held before this step
    #[serde(
        rename = "prev",
        alias = "previous",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous: Option<Locals>,
    /// Return value; a JSON `null` is a real value, an absent key is not
    #[serde(
        rename = "ret",
        alias = "returnValue",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub return_value: Option<Value>,
    /// Output produced during this step
    #[serde(
        rename = "out+",
        alias = "stdout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stdout: Option<String>,
    /// Extension fields not modelled above
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Deserialize a key that is present into `Some`, even when its value is `null`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Event {
    /// Create an event with no payloads
    #[must_use]
    pub fn new(step: u64, kind: impl Into<EventKind>, frame_id: impl Into<FrameId>) -> Self {
        Self {
            step,
            timestamp: TraceInstant::default(),
            delta_time: TraceDelta::zero(),
            kind: kind.into(),
            function_name: String::new(),
            source_line: 0,
            frame_id: frame_id.into(),
            parent_frame_id: None,
            depth: 0,
            args: None,
            assignments: None,
            previous: None,
            return_value: None,
            stdout: None,
            extra: IndexMap::new(),
        }
    }

    /// Set the function name
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    /// Set the source line
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.source_line = line;
        self
    }

    /// Set the parent frame and depth
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<FrameId>, depth: u32) -> Self {
        self.parent_frame_id = Some(parent.into());
        self.depth = depth;
        self
    }

    /// Set timing fields
    #[must_use]
    pub fn with_timing(mut self, timestamp: TraceInstant, delta: TraceDelta) -> Self {
        self.timestamp = timestamp;
        self.delta_time = delta;
        self
    }

    /// Set call arguments
    #[must_use]
    pub fn with_args<I, K>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.args = Some(args.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Set local assignments
    #[must_use]
    pub fn with_assignments<I, K>(mut self, assignments: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.assignments = Some(
            assignments
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        );
        self
    }

    /// Set the return value
    #[must_use]
    pub fn with_return(mut self, value: Value) -> Self {
        self.return_value = Some(value);
        self
    }

    /// Set the output fragment
    #[must_use]
    pub fn with_stdout(mut self, out: impl Into<String>) -> Self {
        self.stdout = Some(out.into());
        self
    }

    /// Add an extension field
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Output fragment, empty when the step printed nothing
    #[must_use]
    pub fn stdout_fragment(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }

    /// Exception type and message carried by an exception event
    #[must_use]
    pub fn exception(&self) -> Option<(String, String)> {
        if self.kind != EventKind::Exception && !self.extra.contains_key("exc_type") {
            return None;
        }
        let text = |key: &str| match self.extra.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Some((text("exc_type"), text("exc")))
    }
}
