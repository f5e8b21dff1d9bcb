//! Playback cursor over an event log.

use serde::{Deserialize, Serialize};

/// Current playback position plus play state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackCursor {
    /// Position in the log
    pub step_index: usize,
    /// Whether playback is running
    pub playing: bool,
    /// Speed multiplier, always positive
    pub speed: f64,
}

impl PlaybackCursor {
    /// Cursor at step 0, paused
    #[must_use]
    pub fn new(speed: f64) -> Self {
        Self {
            step_index: 0,
            playing: false,
            speed,
        }
    }

    /// Move forward, stopping at `max_step`
    pub fn move_forward(&mut self, count: usize, max_step: usize) {
        self.step_index = self.step_index.saturating_add(count).min(max_step);
    }

    /// Move backward, stopping at 0
    pub fn move_backward(&mut self, count: usize) {
        self.step_index = self.step_index.saturating_sub(count);
    }

    /// Set the position, clamped to `[0, max_step]`
    pub fn seek(&mut self, index: i64, max_step: usize) {
        self.step_index = usize::try_from(index.max(0))
            .unwrap_or(usize::MAX)
            .min(max_step);
    }

    /// Back to the first step, stopped, keeping the speed
    pub fn reset(&mut self) {
        self.step_index = 0;
        self.playing = false;
    }
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_new() {
        let cursor = PlaybackCursor::new(2.0);
        assert_eq!(cursor.step_index, 0);
        assert!(!cursor.playing);
        assert_eq!(cursor.speed, 2.0);
    }

    #[test]
    fn test_cursor_move_forward_clamps() {
        let mut cursor = PlaybackCursor::default();
        cursor.move_forward(5, 3);
        assert_eq!(cursor.step_index, 3);
    }

    #[test]
    fn test_cursor_move_backward_clamps() {
        let mut cursor = PlaybackCursor::default();
        cursor.seek(2, 10);
        cursor.move_backward(3);
        assert_eq!(cursor.step_index, 0);
    }

    #[test]
    fn test_cursor_seek() {
        let mut cursor = PlaybackCursor::default();
        cursor.seek(100, 9);
        assert_eq!(cursor.step_index, 9);
        cursor.seek(-4, 9);
        assert_eq!(cursor.step_index, 0);
        cursor.seek(i64::MAX, 9);
        assert_eq!(cursor.step_index, 9);
    }

    #[test]
    fn test_cursor_reset_keeps_speed() {
        let mut cursor = PlaybackCursor::new(0.5);
        cursor.seek(4, 10);
        cursor.playing = true;
        cursor.reset();
        assert_eq!(cursor.step_index, 0);
        assert!(!cursor.playing);
        assert_eq!(cursor.speed, 0.5);
    }
}
