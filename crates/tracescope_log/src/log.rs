//! Immutable event log for one run.

use crate::event::Event;
use crate::payload::TracePayload;
use std::sync::Arc;
use tracescope_core::RunId;

/// Ordered, immutable record of one program run
///
/// Cloning is cheap; all clones share the same events. Position in the log
/// is the unit of navigation: the event at index `i` is step index `i`,
/// whatever its producer-assigned `step` number says.
#[derive(Debug, Clone)]
pub struct EventLog {
    run_id: RunId,
    filename: Arc<str>,
    source: Arc<str>,
    events: Arc<[Event]>,
}

impl EventLog {
    /// Create a log from events with no source attached
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            run_id: RunId::new(),
            filename: Arc::from(TracePayload::DEFAULT_FILENAME),
            source: Arc::from(""),
            events: events.into(),
        }
    }

    /// Create a log from a decoded payload
    #[must_use]
    pub fn from_payload(payload: TracePayload) -> Self {
        let TracePayload {
            filename,
            source_code,
            events,
        } = payload;
        let log = Self {
            run_id: RunId::new(),
            filename: Arc::from(filename),
            source: Arc::from(source_code),
            events: events.into(),
        };
        tracing::debug!(run = %log.run_id, events = log.len(), "event log created");
        log
    }

    /// Identity of this run
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// File name the program ran as
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Program source text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Program source split into lines (`\r\n` normalized)
    #[must_use]
    pub fn source_lines(&self) -> Vec<&str> {
        TracePayload::split_lines(&self.source)
    }

    /// All events in log order
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Event at a step index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log has no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Highest valid step index (0 for an empty log)
    #[must_use]
    pub fn max_step(&self) -> usize {
        self.events.len().saturating_sub(1)
    }

    /// Iterate events in log order
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Rebuild the payload this log was created from
    #[must_use]
    pub fn to_payload(&self) -> TracePayload {
        TracePayload {
            filename: self.filename.to_string(),
            source_code: self.source.to_string(),
            events: self.events.to_vec(),
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
