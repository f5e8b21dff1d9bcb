//! Replay engine for deterministic reconstruction.
//!
//! [`reconstruct`] is the reference fold: it always starts from an empty
//! state. [`ReplayEngine`] answers the same queries incrementally, keeping
//! the last state it produced plus periodic snapshots, and must agree with
//! the reference fold for every step.

use crate::diff::StepDiff;
use crate::snapshot::SnapshotStore;
use crate::state::ProgramState;
use serde::{Deserialize, Serialize};
use tracescope_log::{Event, EventLog};

/// Number of events a fold up to `step_index` processes
///
/// Negative indices process nothing; indices past the end are clamped.
fn events_through(len: usize, step_index: i64) -> usize {
    if step_index < 0 {
        return 0;
    }
    usize::try_from(step_index)
        .map_or(len, |index| index.saturating_add(1))
        .min(len)
}

/// Fold the first `count` events (clamped to the log length)
#[must_use]
pub fn reconstruct_prefix(events: &[Event], count: usize) -> ProgramState {
    let mut state = ProgramState::new();
    for (index, event) in events.iter().enumerate().take(count) {
        state.apply(index, event);
    }
    state
}

/// Program state after the event at `step_index`
///
/// Any integer is accepted. A negative index yields the empty state and an
/// index past the end yields the state after the final event.
#[must_use]
pub fn reconstruct(events: &[Event], step_index: i64) -> ProgramState {
    reconstruct_prefix(events, events_through(events.len(), step_index))
}

/// Like [`reconstruct`], treating a missing index as "nothing processed"
#[must_use]
pub fn reconstruct_at(events: &[Event], step_index: Option<i64>) -> ProgramState {
    step_index.map_or_else(ProgramState::new, |index| reconstruct(events, index))
}

/// Replay engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Keep a full snapshot every this many events (0 = never)
    pub checkpoint_interval: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 256,
        }
    }
}

impl ReplayConfig {
    /// Set the checkpoint interval
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }
}

/// Counters describing how queries were served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Queries answered from the cached state as-is
    pub cache_hits: u64,
    /// Events folded in total
    pub events_folded: u64,
    /// Queries that had to move backwards
    pub rewinds: u64,
    /// Rewinds that resumed from a snapshot instead of the empty state
    pub snapshot_restores: u64,
}

/// Incremental reconstruction over one event log
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    log: EventLog,
    config: ReplayConfig,
    cache: ProgramState,
    snapshots: SnapshotStore,
    stats: ReplayStats,
    last_diff: Option<(usize, StepDiff)>,
}

impl ReplayEngine {
    /// Create an engine over a log
    #[must_use]
    pub fn new(log: EventLog) -> Self {
        let config = ReplayConfig::default();
        Self {
            log,
            snapshots: SnapshotStore::new(config.checkpoint_interval),
            config,
            cache: ProgramState::new(),
            stats: ReplayStats::default(),
            last_diff: None,
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.snapshots = SnapshotStore::new(config.checkpoint_interval);
        self.cache = ProgramState::new();
        self.last_diff = None;
        self.config = config;
        self
    }

    /// Replace the log, discarding every cached state of the old one
    pub fn load(&mut self, log: EventLog) {
        tracing::debug!(run = %log.run_id(), events = log.len(), "replay engine loaded log");
        self.log = log;
        self.cache = ProgramState::new();
        self.snapshots.clear();
        self.stats = ReplayStats::default();
        self.last_diff = None;
    }

    /// Log being replayed
    #[must_use]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Query counters
    #[must_use]
    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Snapshots currently held
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Program state after the event at `step_index`
    ///
    /// Same contract as [`reconstruct`]. Moving forward folds only the new
    /// events; moving backwards resumes from the nearest snapshot.
    pub fn state_at(&mut self, step_index: i64) -> &ProgramState {
        let target = events_through(self.log.len(), step_index);
        self.fold_to(target)
    }

    /// Move the cached state to `target` applied events
    fn fold_to(&mut self, target: usize) -> &ProgramState {
        let applied = self.cache.events_applied;

        if target == applied {
            self.stats.cache_hits += 1;
            return &self.cache;
        }

        if target < applied {
            self.stats.rewinds += 1;
            self.cache = match self.snapshots.nearest_at_or_before(target) {
                Some(snapshot) => {
                    self.stats.snapshot_restores += 1;
                    snapshot.clone()
                }
                None => ProgramState::new(),
            };
            tracing::trace!(
                from = applied,
                to = target,
                resume = self.cache.events_applied,
                "replay rewind"
            );
        }

        let start = self.cache.events_applied;
        for (index, event) in self
            .log
            .events()
            .iter()
            .enumerate()
            .take(target)
            .skip(start)
        {
            self.cache.apply(index, event);
            self.snapshots.record(&self.cache);
            self.stats.events_folded += 1;
        }

        &self.cache
    }

    /// Like [`ReplayEngine::state_at`], treating a missing index as "nothing processed"
    pub fn state_at_opt(&mut self, step_index: Option<i64>) -> ProgramState {
        match step_index {
            Some(index) => self.state_at(index).clone(),
            None => ProgramState::new(),
        }
    }

    /// What the event at `step_index` changed
    ///
    /// The index is clamped like [`ReplayEngine::state_at`]; an empty
    /// result means nothing was processed. The last answer is kept, and a
    /// query for the step after the cached state folds forward without
    /// rewinding.
    pub fn step_diff(&mut self, step_index: i64) -> StepDiff {
        let target = events_through(self.log.len(), step_index);
        let Some(index) = target.checked_sub(1) else {
            return StepDiff::new();
        };
        if let Some((at, diff)) = &self.last_diff {
            if *at == target {
                return diff.clone();
            }
        }

        let Some(frame_id) = self.log.get(index).map(|event| event.frame_id) else {
            return StepDiff::new();
        };
        let before = self.fold_to(index);
        let prior = before.frame(frame_id).cloned();
        let stdout_before = before.stdout.len();
        let after = self.fold_to(target);

        let diff = StepDiff::from_last_event(prior.as_ref(), stdout_before, after);
        self.last_diff = Some((target, diff.clone()));
        diff
    }
}
