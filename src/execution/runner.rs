//! Step runner
//!
//! Runs a single step command through the platform shell inside an
//! environment's working directory, captures output, and reports the exit
//! status. Cancellation kills the child process; the runner never leaves a
//! process behind.

use crate::error::{EngineError, EngineResult};
use crate::execution::cancel::CancelSignal;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Result of one command attempt
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Missing when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub succeeded: bool,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutcome {
    /// Combined output for the job log, stdout first
    pub fn combined_output(&self) -> String {
        let mut out = String::new();
        if !self.stdout.is_empty() {
            out.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Shell-based command runner
#[derive(Debug, Clone, Default)]
pub struct StepRunner;

impl StepRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `command` with `sh -c` in `workdir` with `env` added to the
    /// inherited environment. Returns `Cancelled` if the signal fires before
    /// the process exits.
    pub async fn run(
        &self,
        command: &str,
        workdir: &Path,
        env: &HashMap<String, String>,
        cancel: &CancelSignal,
    ) -> EngineResult<StepOutcome> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let started = Instant::now();
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(workdir)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Internal(format!("failed to spawn '{}': {}", command, e)))?;

        // Drain pipes on their own tasks so a chatty child can't deadlock
        // against our wait.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_task = tokio::spawn(read_lines(stdout));
        let err_task = tokio::spawn(read_lines(stderr));

        let (status, cancelled) = tokio::select! {
            status = child.wait() => {
                let status = status
                    .map_err(|e| EngineError::Internal(format!("wait failed: {}", e)))?;
                (Some(status), false)
            }
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                (None, true)
            }
        };

        let stdout = out_task.await.unwrap_or_default();
        let stderr = err_task.await.unwrap_or_default();

        if cancelled {
            return Err(EngineError::Cancelled);
        }

        let status = match status {
            Some(s) => s,
            None => return Err(EngineError::Internal("child exited without status".into())),
        };
        let outcome = StepOutcome {
            exit_code: status.code(),
            succeeded: status.success(),
            duration: started.elapsed(),
            stdout,
            stderr,
        };
        debug!(
            command,
            exit_code = ?outcome.exit_code,
            duration_ms = outcome.duration.as_millis() as u64,
            "step command finished"
        );
        Ok(outcome)
    }
}

async fn read_lines(pipe: Option<impl tokio::io::AsyncRead + Unpin>) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };
    let mut lines = BufReader::new(pipe).lines();
    let mut buf = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        buf.push_str(&line);
        buf.push('\n');
    }
    buf
}
