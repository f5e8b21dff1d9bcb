//! Playback scheduler.
//!
//! Owns the cursor and advances it against wall-clock time:
//! - At most one step per tick
//! - Each advance waits `max(min_wait, next.delta_time / speed)`
//! - Reaching the last step stops playback in the same tick
//! - Pausing drops the wait baseline, so resuming starts a fresh wait
//!
//! The scheduler never reads the clock itself; callers pass `now` to
//! [`PlaybackScheduler::tick`].

use crate::config::PlaybackConfig;
use crate::cursor::PlaybackCursor;
use std::time::{Duration, Instant};
use tracescope_log::{Event, EventLog};

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing
    Idle,
    /// Playing, but the wait for the next step has not elapsed
    Waiting {
        /// Time left until the next advance
        remaining: Duration,
    },
    /// Moved to this step
    Advanced {
        /// New step index
        step_index: usize,
    },
    /// Moved to the last step and stopped
    Finished {
        /// Final step index
        step_index: usize,
    },
}

impl TickOutcome {
    /// Whether the cursor moved
    #[must_use]
    pub fn moved(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Finished { .. })
    }
}

/// Playback scheduler over one event log
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    /// Log being played
    log: EventLog,
    /// Cursor
    cursor: PlaybackCursor,
    /// Configuration
    config: PlaybackConfig,
    /// When the cursor last advanced; `None` until the first tick after play
    last_advance: Option<Instant>,
}

impl PlaybackScheduler {
    /// Create a stopped scheduler at step 0
    #[must_use]
    pub fn new(log: EventLog, config: PlaybackConfig) -> Self {
        let speed = config.sanitize_speed(config.default_speed);
        Self {
            log,
            cursor: PlaybackCursor::new(speed),
            config,
            last_advance: None,
        }
    }

    /// Cursor state
    #[must_use]
    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    /// Log being played
    #[must_use]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Current step index
    #[must_use]
    pub fn step_index(&self) -> usize {
        self.cursor.step_index
    }

    /// Whether playing
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.cursor.playing
    }

    /// Speed multiplier
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.cursor.speed
    }

    /// Last valid step index (0 for an empty log)
    #[must_use]
    pub fn max_step(&self) -> usize {
        self.log.max_step()
    }

    /// Whether the cursor sits on the last step
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.cursor.step_index >= self.max_step()
    }

    /// Event under the cursor
    #[must_use]
    pub fn current_event(&self) -> Option<&Event> {
        self.log.get(self.cursor.step_index)
    }

    /// Wait before advancing past the current step
    ///
    /// `None` at the last step.
    #[must_use]
    pub fn next_wait(&self) -> Option<Duration> {
        let next = self.log.get(self.cursor.step_index + 1)?;
        let scaled = next.delta_time.scaled(self.cursor.speed);
        Some(scaled.max(self.config.min_wait()))
    }

    /// Start playing
    ///
    /// A no-op at the last step. Returns whether playback is now running.
    pub fn play(&mut self) -> bool {
        if self.cursor.playing {
            return true;
        }
        if self.at_end() {
            tracing::debug!(step = self.cursor.step_index, "play ignored at last step");
            return false;
        }
        self.cursor.playing = true;
        self.last_advance = None;
        tracing::debug!(step = self.cursor.step_index, speed = self.cursor.speed, "playback started");
        true
    }

    /// Stop playing, keeping the position
    pub fn pause(&mut self) {
        if self.cursor.playing {
            tracing::debug!(step = self.cursor.step_index, "playback paused");
        }
        self.cursor.playing = false;
        self.last_advance = None;
    }

    /// Play if stopped, pause if playing
    pub fn toggle(&mut self) -> bool {
        if self.cursor.playing {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Jump to an index, clamped to `[0, max_step]`
    pub fn seek(&mut self, index: i64) {
        let max = self.max_step();
        self.cursor.seek(index, max);
    }

    /// Jump to the last step
    pub fn seek_end(&mut self) {
        self.cursor.step_index = self.max_step();
    }

    /// Move one step forward (no wraparound)
    pub fn step_forward(&mut self) {
        let max = self.max_step();
        self.cursor.move_forward(1, max);
    }

    /// Move one step back (no wraparound)
    pub fn step_back(&mut self) {
        self.cursor.move_backward(1);
    }

    /// Set the speed multiplier; non-positive values become the floor
    pub fn set_speed(&mut self, speed: f64) {
        self.cursor.speed = self.config.sanitize_speed(speed);
    }

    /// Raise speed by one step, up to the configured maximum
    pub fn speed_up(&mut self) {
        let next = (self.cursor.speed + self.config.speed_step).min(self.config.max_speed);
        self.set_speed(next.max(self.cursor.speed.min(self.config.max_speed)));
    }

    /// Lower speed by one step, down to the configured minimum
    pub fn speed_down(&mut self) {
        let next = (self.cursor.speed - self.config.speed_step).max(self.config.min_speed);
        self.set_speed(next.min(self.cursor.speed.max(self.config.min_speed)));
    }

    /// Go back to step 0; play state is left alone
    pub fn reset(&mut self) {
        self.cursor.step_index = 0;
        self.last_advance = None;
    }

    /// Replace the log: cursor back to step 0, stopped, same speed
    pub fn load(&mut self, log: EventLog) {
        tracing::info!(run = %log.run_id(), events = log.len(), "playback log loaded");
        self.log = log;
        self.cursor.reset();
        self.last_advance = None;
    }

    /// Advance playback against the clock
    ///
    /// The first tick after [`PlaybackScheduler::play`] only records the
    /// baseline.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.cursor.playing {
            return TickOutcome::Idle;
        }

        let Some(wait) = self.next_wait() else {
            self.finish();
            return TickOutcome::Finished {
                step_index: self.cursor.step_index,
            };
        };

        let baseline = *self.last_advance.get_or_insert(now);
        let elapsed = now.saturating_duration_since(baseline);
        if elapsed < wait {
            return TickOutcome::Waiting {
                remaining: wait - elapsed,
            };
        }

        self.cursor.step_index += 1;
        self.last_advance = Some(now);
        tracing::trace!(step = self.cursor.step_index, "playback advanced");

        if self.at_end() {
            self.finish();
            TickOutcome::Finished {
                step_index: self.cursor.step_index,
            }
        } else {
            TickOutcome::Advanced {
                step_index: self.cursor.step_index,
            }
        }
    }

    fn finish(&mut self) {
        self.cursor.playing = false;
        self.last_advance = None;
        tracing::debug!(step = self.cursor.step_index, "playback finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tracescope_core::{TraceDelta, TraceInstant};
    use tracescope_log::EventKind;

    fn log_with_deltas(deltas_ms: &[u64]) -> EventLog {
        let events = deltas_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                Event::new(i as u64, EventKind::Line, 1u64)
                    .with_timing(TraceInstant::from_nanos(0), TraceDelta::from_millis(*ms))
            })
            .collect();
        EventLog::new(events)
    }

    fn scheduler(len: usize) -> PlaybackScheduler {
        PlaybackScheduler::new(log_with_deltas(&vec![0; len]), PlaybackConfig::default())
    }

    #[test]
    fn test_scenario_c_min_wait_wins() {
        let mut s = PlaybackScheduler::new(log_with_deltas(&[0, 800]), PlaybackConfig::default());
        s.set_speed(2.0);
        assert_eq!(s.next_wait(), Some(Duration::from_millis(400)));

        s.set_speed(1.0);
        assert_eq!(s.next_wait(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_initial_state() {
        let s = scheduler(3);
        assert_eq!(s.step_index(), 0);
        assert!(!s.is_playing());
        assert_eq!(s.speed(), 1.0);
        assert_eq!(s.max_step(), 2);
    }

    #[test]
    fn test_first_tick_sets_baseline() {
        let mut s = scheduler(3);
        let t0 = Instant::now();
        assert!(s.play());
        assert_eq!(
            s.tick(t0),
            TickOutcome::Waiting {
                remaining: Duration::from_millis(400)
            }
        );
        assert_eq!(
            s.tick(t0 + Duration::from_millis(399)),
            TickOutcome::Waiting {
                remaining: Duration::from_millis(1)
            }
        );
        assert_eq!(
            s.tick(t0 + Duration::from_millis(400)),
            TickOutcome::Advanced { step_index: 1 }
        );
    }

    #[test]
    fn test_finishes_at_last_step() {
        let mut s = scheduler(2);
        let t0 = Instant::now();
        s.play();
        s.tick(t0);
        assert_eq!(
            s.tick(t0 + Duration::from_secs(1)),
            TickOutcome::Finished { step_index: 1 }
        );
        assert!(!s.is_playing());
        assert_eq!(s.tick(t0 + Duration::from_secs(2)), TickOutcome::Idle);
    }

    #[test]
    fn test_play_at_end_is_noop() {
        let mut s = scheduler(3);
        s.seek_end();
        assert!(!s.play());
        assert!(!s.is_playing());
        assert!(!s.toggle());
    }

    #[test]
    fn test_empty_log_never_plays() {
        let mut s = PlaybackScheduler::new(EventLog::default(), PlaybackConfig::default());
        assert!(!s.play());
        s.step_forward();
        assert_eq!(s.step_index(), 0);
        assert!(s.current_event().is_none());
    }

    #[test]
    fn test_pause_resets_baseline() {
        let mut s = scheduler(3);
        let t0 = Instant::now();
        s.play();
        s.tick(t0);
        s.tick(t0 + Duration::from_millis(300));
        s.pause();
        assert_eq!(s.tick(t0 + Duration::from_millis(500)), TickOutcome::Idle);

        s.play();
        let resumed = t0 + Duration::from_millis(600);
        assert!(!s.tick(resumed).moved());
        assert!(!s.tick(resumed + Duration::from_millis(399)).moved());
        assert!(s.tick(resumed + Duration::from_millis(400)).moved());
        assert_eq!(s.step_index(), 1);
    }

    #[test]
    fn test_one_step_per_tick() {
        let mut s = scheduler(5);
        let t0 = Instant::now();
        s.play();
        s.tick(t0);
        s.tick(t0 + Duration::from_secs(60));
        assert_eq!(s.step_index(), 1);
    }

    #[test]
    fn test_seek_and_steps_clamp() {
        let mut s = scheduler(4);
        s.seek(10);
        assert_eq!(s.step_index(), 3);
        s.step_forward();
        assert_eq!(s.step_index(), 3);
        s.seek(-2);
        assert_eq!(s.step_index(), 0);
        s.step_back();
        assert_eq!(s.step_index(), 0);
    }

    #[test]
    fn test_seek_does_not_change_play_state() {
        let mut s = scheduler(4);
        s.play();
        s.seek(2);
        assert!(s.is_playing());
        s.pause();
        s.step_forward();
        assert!(!s.is_playing());
    }

    #[test]
    fn test_seek_to_end_while_playing_finishes_on_tick() {
        let mut s = scheduler(4);
        s.play();
        s.seek_end();
        assert_eq!(
            s.tick(Instant::now()),
            TickOutcome::Finished { step_index: 3 }
        );
        assert!(!s.is_playing());
    }

    #[test]
    fn test_set_speed_floors() {
        let mut s = scheduler(2);
        s.set_speed(0.0);
        assert_eq!(s.speed(), 0.001);
        s.set_speed(-1.0);
        assert_eq!(s.speed(), 0.001);
        s.set_speed(3.0);
        assert_eq!(s.speed(), 3.0);
    }

    #[test]
    fn test_speed_steps_within_range() {
        let mut s = scheduler(2);
        for _ in 0..20 {
            s.speed_up();
        }
        assert_eq!(s.speed(), 4.0);
        for _ in 0..40 {
            s.speed_down();
        }
        assert_eq!(s.speed(), 0.25);
        s.speed_up();
        assert_eq!(s.speed(), 0.5);
    }

    #[test]
    fn test_speed_up_keeps_speed_above_range() {
        let mut s = scheduler(2);
        s.set_speed(10.0);
        s.speed_up();
        assert_eq!(s.speed(), 4.0);
    }

    #[test]
    fn test_reset_keeps_play_state() {
        let mut s = scheduler(4);
        s.seek(2);
        s.play();
        s.reset();
        assert_eq!(s.step_index(), 0);
        assert!(s.is_playing());
    }

    #[test]
    fn test_load_resets_cursor_keeps_speed() {
        let mut s = scheduler(4);
        s.set_speed(2.0);
        s.seek(3);
        s.load(log_with_deltas(&[0, 0]));
        assert_eq!(s.step_index(), 0);
        assert!(!s.is_playing());
        assert_eq!(s.speed(), 2.0);
        assert_eq!(s.max_step(), 1);
    }

    #[test]
    fn test_speed_scales_wait() {
        let mut s = PlaybackScheduler::new(log_with_deltas(&[0, 2000]), PlaybackConfig::default());
        s.set_speed(4.0);
        assert_eq!(s.next_wait(), Some(Duration::from_millis(500)));
        s.set_speed(0.5);
        assert_eq!(s.next_wait(), Some(Duration::from_millis(4000)));
    }

    proptest::proptest! {
        #[test]
        fn prop_monotonic_advance(
            deltas in proptest::collection::vec(0u64..2000, 1..20),
            ticks in proptest::collection::vec(0u64..1500, 1..200),
            speed in 0.25f64..4.0
        ) {
            let mut s = PlaybackScheduler::new(log_with_deltas(&deltas), PlaybackConfig::default());
            s.set_speed(speed);
            s.play();

            let max = s.max_step();
            let mut now = Instant::now();
            let mut previous = s.step_index();
            for gap in ticks {
                now += Duration::from_millis(gap);
                let was_playing = s.is_playing();
                let outcome = s.tick(now);
                let current = s.step_index();

                prop_assert!(current >= previous);
                prop_assert!(current - previous <= 1);
                if !was_playing {
                    prop_assert_eq!(current, previous);
                }
                if current == max {
                    prop_assert!(!s.is_playing());
                } else {
                    prop_assert_eq!(s.is_playing(), was_playing);
                }
                prop_assert_eq!(outcome.moved(), current != previous);
                previous = current;
            }
        }
    }
}
