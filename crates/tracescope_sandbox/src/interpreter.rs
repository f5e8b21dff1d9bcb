//! Interpreter backends.

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::protocol::{Request, Response, RunRequest};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracescope_log::TracePayload;

/// Something that runs programs and hands back their traces
///
/// Implementations need not guard against overlapping runs;
/// [`crate::InterpreterHandle`] does that.
#[async_trait]
pub trait Interpreter: Send {
    /// Bring the interpreter up; a no-op if already started
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InterpreterInitFailed`] if it cannot start
    async fn start(&mut self) -> Result<(), SandboxError>;

    /// Run one program to completion
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::RunFailed`] or [`SandboxError::MalformedTrace`]
    async fn run(&mut self, request: RunRequest) -> Result<TracePayload, SandboxError>;

    /// Shut the interpreter down
    ///
    /// # Errors
    ///
    /// Returns error if shutdown fails
    async fn stop(&mut self) -> Result<(), SandboxError>;

    /// Whether `start` has succeeded and `stop` has not been called since
    fn is_started(&self) -> bool;
}

/// Pipes of a running interpreter process
struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Worker {
    async fn send(&mut self, request: &Request) -> Result<(), SandboxError> {
        let line = request.to_line()?;
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Next non-blank line; `None` once the process closed stdout
    async fn recv(&mut self) -> Result<Option<Response>, SandboxError> {
        while let Some(line) = self.stdout.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            tracing::trace!(len = line.len(), "interpreter line");
            return Response::from_line(&line).map(Some);
        }
        Ok(None)
    }

    async fn request(
        &mut self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Option<Response>, TimedOut> {
        let exchange = async {
            self.send(request).await?;
            self.recv().await
        };
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result.map_err(TimedOut::Failed),
            Err(_) => Err(TimedOut::Elapsed),
        }
    }

    async fn kill(mut self) {
        if let Err(err) = self.child.kill().await {
            tracing::warn!(error = %err, "failed to kill interpreter process");
        }
    }
}

/// Failure of a request/response exchange
enum TimedOut {
    Elapsed,
    Failed(SandboxError),
}

/// Interpreter running as a child process speaking JSON lines
pub struct ProcessInterpreter {
    config: SandboxConfig,
    worker: Option<Worker>,
}

impl ProcessInterpreter {
    /// Create an interpreter that will spawn `config.program` on start
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }

    /// Launch configuration
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn spawn(&self) -> Result<Worker, SandboxError> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| SandboxError::InterpreterInitFailed {
                reason: format!("could not spawn {}: {err}", self.config.program),
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => Ok(Worker {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            _ => Err(SandboxError::InterpreterInitFailed {
                reason: "failed to capture interpreter pipes".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Interpreter for ProcessInterpreter {
    async fn start(&mut self) -> Result<(), SandboxError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let mut worker = self.spawn()?;
        let timeout = self.config.init_timeout();
        let outcome = match worker.request(&Request::Init, timeout).await {
            Ok(Some(response)) => response.into_ready(),
            Ok(None) => Err(SandboxError::InterpreterInitFailed {
                reason: "interpreter exited during init".to_string(),
            }),
            Err(TimedOut::Elapsed) => Err(SandboxError::InterpreterInitFailed {
                reason: format!("no ready message within {}ms", self.config.init_timeout_ms),
            }),
            Err(TimedOut::Failed(err)) => Err(SandboxError::InterpreterInitFailed {
                reason: err.to_string(),
            }),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(program = %self.config.program, "interpreter ready");
                self.worker = Some(worker);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(program = %self.config.program, error = %err, "interpreter init failed");
                worker.kill().await;
                Err(err)
            }
        }
    }

    async fn run(&mut self, request: RunRequest) -> Result<TracePayload, SandboxError> {
        let Some(worker) = self.worker.as_mut() else {
            return Err(SandboxError::NotStarted);
        };

        tracing::debug!(
            source_len = request.source_code.len(),
            stdin_lines = request.stdin_lines.len(),
            "run sent to interpreter"
        );
        let timeout = self.config.run_timeout();
        match worker.request(&Request::Run(request), timeout).await {
            Ok(Some(response)) => response.into_payload(),
            Ok(None) => {
                if let Some(worker) = self.worker.take() {
                    worker.kill().await;
                }
                Err(SandboxError::RunFailed {
                    message: "interpreter exited before replying".to_string(),
                })
            }
            Err(TimedOut::Elapsed) => {
                // The process may still be mid-run; it cannot be reused.
                if let Some(worker) = self.worker.take() {
                    worker.kill().await;
                }
                tracing::warn!(timeout_ms = self.config.run_timeout_ms, "run timed out, interpreter stopped");
                Err(SandboxError::RunFailed {
                    message: format!("no result within {}ms", self.config.run_timeout_ms),
                })
            }
            Err(TimedOut::Failed(SandboxError::Io(message))) => {
                // Broken pipes mean the process is gone.
                if let Some(worker) = self.worker.take() {
                    worker.kill().await;
                }
                tracing::warn!(error = %message, "interpreter pipe failed, interpreter stopped");
                Err(SandboxError::RunFailed { message })
            }
            Err(TimedOut::Failed(err)) => Err(err),
        }
    }

    async fn stop(&mut self) -> Result<(), SandboxError> {
        if let Some(worker) = self.worker.take() {
            worker.kill().await;
            tracing::info!(program = %self.config.program, "interpreter stopped");
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.worker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> ProcessInterpreter {
        ProcessInterpreter::new(
            SandboxConfig::new("sh")
                .with_args(["-c", script])
                .with_init_timeout_ms(5_000)
                .with_run_timeout_ms(5_000),
        )
    }

    #[tokio::test]
    async fn test_missing_binary_fails_init() {
        let mut interp =
            ProcessInterpreter::new(SandboxConfig::new("/nonexistent/tracescope-interpreter"));
        let err = interp.start().await.unwrap_err();
        assert!(matches!(err, SandboxError::InterpreterInitFailed { .. }));
        assert!(!interp.is_started());
    }

    #[tokio::test]
    async fn test_run_before_start() {
        let mut interp = shell("true");
        let err = interp.run(RunRequest::new("x = 1", Vec::new())).await.unwrap_err();
        assert_eq!(err, SandboxError::NotStarted);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_init_and_run() {
        let mut interp = shell(
            r#"read init; echo '{"type":"ready"}'; read run; echo '{"type":"trace","payload":{"code":"x = 1","trace":[{"step":1,"event":"Line","fid":1,"line":1,"set":{"x":1}}]}}'; read rest"#,
        );
        interp.start().await.unwrap();
        assert!(interp.is_started());

        let payload = interp.run(RunRequest::new("x = 1", Vec::new())).await.unwrap();
        assert_eq!(payload.source_code, "x = 1");
        assert_eq!(payload.events.len(), 1);

        interp.stop().await.unwrap();
        assert!(!interp.is_started());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_init_error_message() {
        let mut interp = shell(r#"read init; echo '{"type":"error","message":"no tracer"}'"#);
        let err = interp.start().await.unwrap_err();
        assert_eq!(
            err,
            SandboxError::InterpreterInitFailed {
                reason: "no tracer".into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_error_and_garbage() {
        let mut interp = shell(
            r#"read init; echo '{"type":"ready"}'; read a; echo '{"type":"error","message":"NameError"}'; read b; echo 'not json'; read rest"#,
        );
        interp.start().await.unwrap();

        let err = interp.run(RunRequest::new("y", Vec::new())).await.unwrap_err();
        assert_eq!(
            err,
            SandboxError::RunFailed {
                message: "NameError".into()
            }
        );
        assert!(interp.is_started());

        let err = interp.run(RunRequest::new("z", Vec::new())).await.unwrap_err();
        assert!(matches!(err, SandboxError::MalformedTrace { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_during_run() {
        let mut interp = shell(r#"read init; echo '{"type":"ready"}'; read run"#);
        interp.start().await.unwrap();
        let err = interp.run(RunRequest::new("x", Vec::new())).await.unwrap_err();
        assert!(err.is_run_failure());
        assert!(!interp.is_started());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dead_process_between_runs() {
        let mut interp = shell(r#"read init; echo '{"type":"ready"}'; exit 0"#);
        interp.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let err = interp.run(RunRequest::new("x", Vec::new())).await.unwrap_err();
        assert!(err.is_run_failure());
        assert!(!interp.is_started());

        let err = interp.run(RunRequest::new("x", Vec::new())).await.unwrap_err();
        assert_eq!(err, SandboxError::NotStarted);
    }
}
