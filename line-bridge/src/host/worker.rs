//! Worker Process Supervision
//!
//! This module provides the `WorkerProcess` struct that manages one bridge
//! worker subprocess, feeding newline-delimited input to its stdin and
//! collecting the result envelope and error text it leaves behind.
//!
//! # Protocol
//!
//! Workers speak the line bridge stream protocol:
//! - stdin: UTF-8 text, one message per line, terminated by `\n`
//! - stdout: a single JSON document `{"result": <value>}` per run
//! - stderr: free-form error and log text
//!
//! # Safety
//!
//! This implementation:
//! - Uses pure async I/O (no blocking)
//! - Ensures child process cleanup on drop
//! - Drains stdout and stderr together so neither pipe can stall the worker

use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, trace, warn};

use crate::envelope;

/// Errors that can occur while supervising a worker process
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker process: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("IPC communication error: {0}")]
    IpcError(String),

    #[error("Failed to decode result envelope: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Worker reported an error: {0}")]
    ReportedError(String),

    #[error("Worker did not finish within {0:?}")]
    WaitTimeout(Duration),

    #[error("No worker registered under name: {0}")]
    UnknownWorker(String),
}

/// Everything a worker run leaves behind once it exits
#[derive(Debug)]
pub struct WorkerOutput<T> {
    /// Decoded value from the worker's result envelope
    pub result: T,

    /// Raw stderr text captured alongside the result
    pub stderr: String,

    /// Exit status of the worker process
    pub status: ExitStatus,
}

/// Handle to one spawned bridge worker subprocess
pub struct WorkerProcess {
    /// Handle to the spawned subprocess
    child: Child,

    /// Piped stdin, present until closed
    stdin: Option<ChildStdin>,

    /// Program name for logging
    program: String,
}

impl WorkerProcess {
    /// Spawn a worker with all three standard streams piped.
    ///
    /// The child is killed when the handle is dropped, so an abandoned
    /// worker cannot outlive its host.
    ///
    /// # Arguments
    ///
    /// * `program` - Path or name of the worker executable
    /// * `args` - Arguments passed to the worker
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::SpawnError` if the process cannot be started,
    /// for example when the executable does not exist.
    pub fn spawn<S, I, A>(program: S, args: I) -> Result<Self, WorkerError>
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let program_name = program.as_ref().to_string_lossy().into_owned();

        let mut child = Command::new(program.as_ref())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // Ensure cleanup if the host exits
            .spawn()?;

        info!(program = %program_name, pid = child.id(), "Worker process spawned");

        let stdin = child.stdin.take();
        Ok(Self {
            child,
            stdin,
            program: program_name,
        })
    }

    /// Write one line to the worker's stdin and flush.
    ///
    /// The terminating `\n` is appended here; `data` itself should not
    /// contain one, or the worker will see two messages.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::IpcError` if stdin is already closed or the
    /// write fails.
    pub async fn send_line(&mut self, data: &str) -> Result<(), WorkerError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| WorkerError::IpcError("Worker stdin already closed".to_string()))?;

        stdin
            .write_all(data.as_bytes())
            .await
            .map_err(|e| WorkerError::IpcError(format!("Failed to write line: {}", e)))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| WorkerError::IpcError(format!("Failed to write line terminator: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| WorkerError::IpcError(format!("Failed to flush worker stdin: {}", e)))?;

        trace!(payload_len = data.len(), "Line sent to worker");
        Ok(())
    }

    /// Close the worker's stdin so it observes end of input.
    ///
    /// Workers that collect lines until their input ends need this before
    /// they will report a result. Calling it twice is harmless.
    pub fn close_stdin(&mut self) {
        if self.stdin.take().is_some() {
            debug!(program = %self.program, "Worker stdin closed");
        }
    }

    /// Wait for the worker to exit and decode its result envelope.
    ///
    /// This method:
    /// 1. Closes stdin so the worker sees end of input
    /// 2. Drains stdout and stderr to completion
    /// 3. Awaits the exit status
    /// 4. Decodes the single `{"result": <value>}` document from stdout
    ///
    /// A nonzero exit status with a valid envelope still counts as success;
    /// the status is surfaced in [`WorkerOutput`] for the caller to inspect.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::ReportedError` carrying the stderr text when
    /// the worker produced no decodable envelope but did write to stderr,
    /// `WorkerError::DecodeError` when stdout is undecodable and stderr is
    /// empty, or `WorkerError::IpcError` if a pipe fails.
    pub async fn wait_output<T: DeserializeOwned>(
        mut self,
    ) -> Result<WorkerOutput<T>, WorkerError> {
        self.close_stdin();

        let mut stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::IpcError("Worker stdout was not piped".to_string()))?;
        let mut stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| WorkerError::IpcError("Worker stderr was not piped".to_string()))?;

        // Drain both pipes together so a chatty stderr cannot fill its
        // buffer and stall the worker while stdout is being read.
        let mut out_buf = String::new();
        let mut err_buf = String::new();
        let (out_read, err_read) = tokio::join!(
            stdout.read_to_string(&mut out_buf),
            stderr.read_to_string(&mut err_buf),
        );
        out_read.map_err(|e| WorkerError::IpcError(format!("Failed to read worker stdout: {}", e)))?;
        err_read.map_err(|e| WorkerError::IpcError(format!("Failed to read worker stderr: {}", e)))?;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| WorkerError::IpcError(format!("Failed to await worker exit: {}", e)))?;

        debug!(
            program = %self.program,
            exit_status = %status,
            stdout_len = out_buf.len(),
            stderr_len = err_buf.len(),
            "Worker finished"
        );

        match envelope::decode(&out_buf) {
            Ok(result) => Ok(WorkerOutput {
                result,
                stderr: err_buf,
                status,
            }),
            Err(_) if !err_buf.is_empty() => {
                warn!(program = %self.program, "Worker reported an error instead of a result");
                Err(WorkerError::ReportedError(err_buf))
            }
            Err(e) => Err(WorkerError::DecodeError(e)),
        }
    }

    /// Wait for the worker's result with a deadline.
    ///
    /// Wraps [`WorkerProcess::wait_output`] with a timeout to prevent a
    /// hung worker from blocking the calling task indefinitely. On timeout
    /// the handle is dropped, which kills the process.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait for the worker to finish
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::WaitTimeout` if the worker does not finish
    /// within the specified duration.
    pub async fn wait_output_timeout<T: DeserializeOwned>(
        self,
        timeout: Duration,
    ) -> Result<WorkerOutput<T>, WorkerError> {
        let program = self.program.clone();
        match tokio::time::timeout(timeout, self.wait_output()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis(),
                    program = %program,
                    "Worker did not finish in time"
                );
                Err(WorkerError::WaitTimeout(timeout))
            }
        }
    }

    /// Check if the worker process is still running.
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,     // Process still running
            Ok(Some(_)) => false, // Process has exited
            Err(_) => false,      // Error checking status
        }
    }

    /// Get the process ID of the worker (if still running).
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Gracefully shutdown the worker by killing the process.
    pub async fn shutdown(mut self) -> Result<(), WorkerError> {
        info!(program = %self.program, pid = self.child.id(), "Shutting down worker");

        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Error during worker shutdown");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test error variants
    #[test]
    fn test_error_messages() {
        let spawn_err = WorkerError::SpawnError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "worker binary not found",
        ));
        assert!(spawn_err.to_string().contains("spawn"));

        let ipc_err = WorkerError::IpcError("broken pipe".to_string());
        assert!(ipc_err.to_string().contains("broken pipe"));

        let reported = WorkerError::ReportedError("stack trace here".to_string());
        assert!(reported.to_string().contains("stack trace here"));

        let unknown = WorkerError::UnknownWorker("transcode".to_string());
        assert!(unknown.to_string().contains("transcode"));
    }

    #[test]
    fn test_wait_timeout_error_message() {
        let err = WorkerError::WaitTimeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_spawn_error() {
        let outcome = WorkerProcess::spawn("definitely-not-a-real-worker", Vec::<String>::new());
        assert!(matches!(outcome, Err(WorkerError::SpawnError(_))));
    }
}
