//! Streaming subprocess runner.
//!
//! Provisioning steps can run for a long time, so their output is logged
//! line by line as it arrives instead of being buffered until exit. The last
//! [`TAIL_LINES`] lines are kept for error reporting.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::provisioner::ProvisionError;

/// Number of output lines retained for error reporting.
pub const TAIL_LINES: usize = 200;

/// Result of a finished step.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Last lines of combined stdout/stderr, in arrival order.
    pub tail: String,
}

/// Bounded FIFO of output lines.
#[derive(Debug, Default)]
struct LineTail {
    lines: VecDeque<String>,
}

impl LineTail {
    fn push(&mut self, line: String) {
        if self.lines.len() == TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn joined(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Spawn `cmd`, log every output line under `label` and wait for exit.
///
/// The child is killed if the returned future is dropped.
pub async fn run_streaming(cmd: &mut Command, label: &'static str) -> Result<StepOutput, ProvisionError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(ProvisionError::Spawn)?;

    let tail = Arc::new(Mutex::new(LineTail::default()));
    let stdout_task = tokio::spawn(pump_lines(child.stdout.take(), label, "stdout", Arc::clone(&tail)));
    let stderr_task = tokio::spawn(pump_lines(child.stderr.take(), label, "stderr", Arc::clone(&tail)));

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let tail = tail.lock().unwrap_or_else(|e| e.into_inner()).joined();

    Ok(StepOutput {
        success: status.success(),
        exit_code: status.code(),
        tail,
    })
}

async fn pump_lines<R: AsyncRead + Unpin>(
    stream: Option<R>,
    label: &'static str,
    stream_name: &'static str,
    tail: Arc<Mutex<LineTail>>,
) {
    let Some(stream) = stream else {
        return;
    };

    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(cmd = label, stream = stream_name, %line);
                tail.lock().unwrap_or_else(|e| e.into_inner()).push(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(cmd = label, stream = stream_name, error = %e, "Stopped reading output");
                break;
            }
        }
    }
}
