//! Run session: an interpreter plus the last good trace.
//!
//! A failed run never discards the previous trace, so the player can keep
//! showing it.

use crate::error::SandboxError;
use crate::handle::InterpreterHandle;
use crate::interpreter::Interpreter;
use crate::protocol::RunRequest;
use tokio::sync::RwLock;
use tracescope_log::EventLog;

/// Interpreter session
pub struct Session {
    handle: InterpreterHandle,
    last_trace: RwLock<Option<EventLog>>,
}

impl Session {
    /// Create a session around an interpreter (not started yet)
    #[must_use]
    pub fn new(interpreter: impl Interpreter + 'static) -> Self {
        Self {
            handle: InterpreterHandle::new(interpreter),
            last_trace: RwLock::new(None),
        }
    }

    /// Underlying handle
    #[must_use]
    pub fn handle(&self) -> &InterpreterHandle {
        &self.handle
    }

    /// Start the interpreter
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InterpreterInitFailed`] on failure
    pub async fn start(&self) -> Result<(), SandboxError> {
        self.handle.start().await
    }

    /// Stop the interpreter; the last trace stays available
    ///
    /// # Errors
    ///
    /// Returns error if shutdown fails
    pub async fn stop(&self) -> Result<(), SandboxError> {
        self.handle.stop().await
    }

    /// Run a program and keep its trace on success
    ///
    /// # Errors
    ///
    /// Returns the run's error; the previously kept trace is left untouched
    pub async fn run(&self, request: RunRequest) -> Result<EventLog, SandboxError> {
        match self.handle.run(request).await {
            Ok(payload) => {
                let log = EventLog::from_payload(payload);
                tracing::info!(run = %log.run_id(), events = log.len(), "trace accepted");
                *self.last_trace.write().await = Some(log.clone());
                Ok(log)
            }
            Err(err) => {
                tracing::warn!(error = %err, "run produced no trace");
                Err(err)
            }
        }
    }

    /// Most recent successful trace
    pub async fn last_trace(&self) -> Option<EventLog> {
        self.last_trace.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::GatedInterpreter;
    use std::sync::Arc;
    use tokio::sync::Notify;
    use tracescope_replay::ReplayEngine;

    #[tokio::test]
    async fn test_scenario_d_busy_run_rejected_first_delivered() {
        let gate = Arc::new(Notify::new());
        let session = Arc::new(Session::new(GatedInterpreter::new(gate.clone())));
        session.start().await.unwrap();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.run(RunRequest::new("print('hi')", Vec::new())).await }
        });
        while !session.handle().is_busy() {
            tokio::task::yield_now().await;
        }

        let err = session
            .run(RunRequest::new("print('again')", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err, SandboxError::RunRejectedBusy);
        assert!(session.last_trace().await.is_none());

        gate.notify_one();
        let log = first.await.unwrap().unwrap();
        let kept = session.last_trace().await.unwrap();
        assert_eq!(kept.run_id(), log.run_id());

        let mut engine = ReplayEngine::new(kept);
        let state = engine.state_at(2);
        assert_eq!(state.stdout, "hi\n");
        assert_eq!(state.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_previous_trace() {
        let gate = Arc::new(Notify::new());
        let session = Session::new(GatedInterpreter::new(gate.clone()));
        session.start().await.unwrap();

        gate.notify_one();
        let good = session.run(RunRequest::new("ok", Vec::new())).await.unwrap();

        gate.notify_one();
        let err = session
            .run(RunRequest::new("raise RuntimeError", Vec::new()))
            .await
            .unwrap_err();
        assert!(err.is_run_failure());

        session.stop().await.unwrap();
        let err = session.run(RunRequest::new("after stop", Vec::new())).await.unwrap_err();
        assert_eq!(err, SandboxError::NotStarted);

        let kept = session.last_trace().await.unwrap();
        assert_eq!(kept.run_id(), good.run_id());
        assert_eq!(kept.source(), "ok");
    }
}
