//! Async playback driver.
//!
//! Moves a [`PlaybackScheduler`] into a tokio task that is the only owner of
//! the cursor. Callers send [`PlaybackCommand`]s and watch
//! [`PlaybackSnapshot`]s. The tick interval only runs while playing.

use crate::cursor::PlaybackCursor;
use crate::scheduler::PlaybackScheduler;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracescope_core::RunId;
use tracescope_log::EventLog;

/// Commands accepted by the driver
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Start playing
    Play,
    /// Stop playing
    Pause,
    /// Play or pause
    Toggle,
    /// Jump to an index (clamped)
    Seek(i64),
    /// Jump to the last step
    SeekEnd,
    /// One step forward
    StepForward,
    /// One step back
    StepBack,
    /// Set the speed multiplier
    SetSpeed(f64),
    /// Raise speed by one increment
    SpeedUp,
    /// Lower speed by one increment
    SpeedDown,
    /// Back to step 0
    Reset,
    /// Replace the log
    Load(EventLog),
}

/// What the driver publishes after every change
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    /// Run being played
    pub run_id: RunId,
    /// Cursor
    pub cursor: PlaybackCursor,
    /// Last valid step index
    pub max_step: usize,
}

impl PlaybackSnapshot {
    fn of(scheduler: &PlaybackScheduler) -> Self {
        Self {
            run_id: scheduler.log().run_id(),
            cursor: scheduler.cursor(),
            max_step: scheduler.max_step(),
        }
    }
}

/// Driver errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The driver task is gone
    #[error("playback driver has stopped")]
    Stopped,
}

/// Handle to a running playback task
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct PlaybackDriver {
    commands: mpsc::Sender<PlaybackCommand>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<PlaybackScheduler>>,
}

impl PlaybackDriver {
    /// Spawn the playback task on the current runtime
    ///
    /// `tick` is how often the scheduler is polled while playing.
    #[must_use]
    pub fn spawn(scheduler: PlaybackScheduler, tick: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::of(&scheduler));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drive(
            scheduler,
            command_rx,
            snapshot_tx,
            cancel.clone(),
            tick.max(Duration::from_millis(1)),
        ));

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            cancel,
            task: Some(task),
        }
    }

    /// Send a command
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Stopped`] if the task has exited
    pub async fn send(&self, command: PlaybackCommand) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Stopped)
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver for snapshot changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Token that stops the task when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the task and take the scheduler back
    ///
    /// Returns `None` if the task panicked.
    pub async fn shutdown(mut self) -> Option<PlaybackScheduler> {
        self.cancel.cancel();
        let task = self.task.take()?;
        match task.await {
            Ok(scheduler) => Some(scheduler),
            Err(err) => {
                tracing::warn!(error = %err, "playback task did not exit cleanly");
                None
            }
        }
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn dispatch(scheduler: &mut PlaybackScheduler, command: PlaybackCommand) {
    match command {
        PlaybackCommand::Play => {
            scheduler.play();
        }
        PlaybackCommand::Pause => scheduler.pause(),
        PlaybackCommand::Toggle => {
            scheduler.toggle();
        }
        PlaybackCommand::Seek(index) => scheduler.seek(index),
        PlaybackCommand::SeekEnd => scheduler.seek_end(),
        PlaybackCommand::StepForward => scheduler.step_forward(),
        PlaybackCommand::StepBack => scheduler.step_back(),
        PlaybackCommand::SetSpeed(speed) => scheduler.set_speed(speed),
        PlaybackCommand::SpeedUp => scheduler.speed_up(),
        PlaybackCommand::SpeedDown => scheduler.speed_down(),
        PlaybackCommand::Reset => scheduler.reset(),
        PlaybackCommand::Load(log) => scheduler.load(log),
    }
}

async fn drive(
    mut scheduler: PlaybackScheduler,
    mut commands: mpsc::Receiver<PlaybackCommand>,
    snapshots: watch::Sender<PlaybackSnapshot>,
    cancel: CancellationToken,
    tick: Duration,
) -> PlaybackScheduler {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let playing = scheduler.is_playing();

        tokio::select! {
            () = cancel.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                dispatch(&mut scheduler, command);
                if !playing && scheduler.is_playing() {
                    interval.reset_immediately();
                }
            }
            _ = interval.tick(), if playing => {
                scheduler.tick(Instant::now().into_std());
            }
        }

        let next = PlaybackSnapshot::of(&scheduler);
        snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    tracing::debug!(step = scheduler.step_index(), "playback driver stopped");
    scheduler
}
