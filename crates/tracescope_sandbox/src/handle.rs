//! Long-lived interpreter handle.
//!
//! Owns one interpreter instance and enforces a single run in flight.
//! A second run request while one is executing is rejected, not queued.

use crate::error::SandboxError;
use crate::interpreter::Interpreter;
use crate::protocol::RunRequest;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracescope_log::TracePayload;

/// Shared handle to one interpreter
pub struct InterpreterHandle {
    inner: Mutex<Box<dyn Interpreter>>,
    busy: AtomicBool,
}

/// Clears the busy flag when dropped
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl InterpreterHandle {
    /// Wrap an interpreter
    #[must_use]
    pub fn new(interpreter: impl Interpreter + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::new(interpreter)),
            busy: AtomicBool::new(false),
        }
    }

    /// Start the interpreter (no-op if already started)
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InterpreterInitFailed`] on failure; there is
    /// no automatic retry.
    pub async fn start(&self) -> Result<(), SandboxError> {
        self.inner.lock().await.start().await
    }

    /// Stop the interpreter
    ///
    /// # Errors
    ///
    /// Returns error if shutdown fails
    pub async fn stop(&self) -> Result<(), SandboxError> {
        self.inner.lock().await.stop().await
    }

    /// Whether a run is executing
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether the interpreter has been started
    pub async fn is_started(&self) -> bool {
        self.inner.lock().await.is_started()
    }

    /// Run a program
    ///
    /// # Errors
    ///
    /// - [`SandboxError::RunRejectedBusy`] if another run is in flight
    /// - [`SandboxError::NotStarted`] before a successful [`InterpreterHandle::start`]
    /// - whatever the interpreter reports for the run itself
    pub async fn run(&self, request: RunRequest) -> Result<TracePayload, SandboxError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::info!("run rejected: another run is in progress");
            return Err(SandboxError::RunRejectedBusy);
        };

        let mut interpreter = self.inner.lock().await;
        if !interpreter.is_started() {
            return Err(SandboxError::NotStarted);
        }
        interpreter.run(request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Notify;
    use tracescope_log::Event;
    use tracescope_log::EventKind;

    /// Interpreter whose runs finish only when the gate is opened
    ///
    /// Programs starting with `raise` fail.
    pub(crate) struct GatedInterpreter {
        gate: Arc<Notify>,
        started: bool,
    }

    impl GatedInterpreter {
        pub(crate) fn new(gate: Arc<Notify>) -> Self {
            Self {
                gate,
                started: false,
            }
        }
    }

    #[async_trait]
    impl Interpreter for GatedInterpreter {
        async fn start(&mut self) -> Result<(), SandboxError> {
            self.started = true;
            Ok(())
        }

        async fn run(&mut self, request: RunRequest) -> Result<TracePayload, SandboxError> {
            self.gate.notified().await;
            if request.source_code.starts_with("raise") {
                return Err(SandboxError::RunFailed {
                    message: "Exception".to_string(),
                });
            }
            Ok(TracePayload {
                filename: TracePayload::DEFAULT_FILENAME.to_string(),
                source_code: request.source_code,
                events: vec![
                    Event::new(1, EventKind::Call, 1u64).with_function("<module>"),
                    Event::new(2, EventKind::Line, 1u64).with_stdout("hi\n"),
                    Event::new(3, EventKind::Return, 1u64),
                ],
            })
        }

        async fn stop(&mut self) -> Result<(), SandboxError> {
            self.started = false;
            Ok(())
        }

        fn is_started(&self) -> bool {
            self.started
        }
    }

    async fn wait_busy(handle: &InterpreterHandle) {
        while !handle.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_run_before_start() {
        let handle = InterpreterHandle::new(GatedInterpreter::new(Arc::new(Notify::new())));
        let err = handle.run(RunRequest::new("x", Vec::new())).await.unwrap_err();
        assert_eq!(err, SandboxError::NotStarted);
        assert!(!handle.is_busy());
    }

    #[tokio::test]
    async fn test_second_run_rejected_while_busy() {
        let gate = Arc::new(Notify::new());
        let handle = Arc::new(InterpreterHandle::new(GatedInterpreter::new(gate.clone())));
        handle.start().await.unwrap();

        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.run(RunRequest::new("first", Vec::new())).await }
        });
        wait_busy(&handle).await;

        let err = handle
            .run(RunRequest::new("second", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err, SandboxError::RunRejectedBusy);

        gate.notify_one();
        let payload = first.await.unwrap().unwrap();
        assert_eq!(payload.source_code, "first");
        assert!(!handle.is_busy());
    }

    #[tokio::test]
    async fn test_busy_released_after_failure() {
        let gate = Arc::new(Notify::new());
        let handle = InterpreterHandle::new(GatedInterpreter::new(gate.clone()));
        handle.start().await.unwrap();

        gate.notify_one();
        let err = handle
            .run(RunRequest::new("raise ValueError", Vec::new()))
            .await
            .unwrap_err();
        assert!(err.is_run_failure());
        assert!(!handle.is_busy());

        gate.notify_one();
        assert!(handle.run(RunRequest::new("ok", Vec::new())).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_then_run() {
        let gate = Arc::new(Notify::new());
        let handle = InterpreterHandle::new(GatedInterpreter::new(gate));
        handle.start().await.unwrap();
        assert!(handle.is_started().await);
        handle.stop().await.unwrap();
        assert!(!handle.is_started().await);
        assert_eq!(
            handle.run(RunRequest::new("x", Vec::new())).await.unwrap_err(),
            SandboxError::NotStarted
        );
    }
}
