//! Snapshot store for incremental reconstruction.
//!
//! Holds full states at regular positions in the log so that seeking
//! backwards only folds forward from the nearest earlier snapshot.

use crate::state::ProgramState;
use std::collections::BTreeMap;

/// States cached by number of events applied
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Spacing between snapshots; 0 disables recording
    interval: usize,
    /// Cached states keyed by events applied
    cache: BTreeMap<usize, ProgramState>,
}

impl SnapshotStore {
    /// Create a store that keeps a state every `interval` events
    #[must_use]
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            cache: BTreeMap::new(),
        }
    }

    /// Snapshot spacing
    #[must_use]
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Record a state if it falls on the snapshot grid
    ///
    /// Returns true if the state was stored.
    pub fn record(&mut self, state: &ProgramState) -> bool {
        let applied = state.events_applied;
        if self.interval == 0 || applied == 0 || applied % self.interval != 0 {
            return false;
        }
        if self.cache.contains_key(&applied) {
            return false;
        }
        self.cache.insert(applied, state.clone());
        true
    }

    /// Latest snapshot with at most `events_applied` events folded in
    #[must_use]
    pub fn nearest_at_or_before(&self, events_applied: usize) -> Option<&ProgramState> {
        self.cache
            .range(..=events_applied)
            .next_back()
            .map(|(_, state)| state)
    }

    /// Positions currently cached
    #[must_use]
    pub fn cached_positions(&self) -> Vec<usize> {
        self.cache.keys().copied().collect()
    }

    /// Number of cached snapshots
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every snapshot
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(256)
    }
}
