//! Spawning external programs with their output routed through tracing.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::ToolkitError;

/// Lines of stderr kept for error reports.
const STDERR_TAIL: usize = 20;

/// A command that ran to completion, successfully or not.
#[derive(Debug)]
pub struct Finished {
    pub command: String,
    pub status: ExitStatus,
    pub stderr: Vec<String>,
}

impl Finished {
    /// Turn a non-zero exit into [`ToolkitError::Failed`].
    pub fn check(self) -> Result<(), ToolkitError> {
        if self.status.success() {
            Ok(())
        } else {
            Err(ToolkitError::Failed {
                command: self.command,
                status: self.status.to_string(),
                stderr: self.stderr,
            })
        }
    }
}

/// Run `program` in `cwd` and wait for it.
///
/// Stdout lines are logged at info, stderr lines at warn. The child is killed
/// if the returned future is dropped.
pub async fn run_command(
    program: &str,
    args: &[OsString],
    cwd: &Path,
) -> Result<Finished, ToolkitError> {
    let command = describe(program, args);
    tracing::info!(command = %command, cwd = %cwd.display(), "Running");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolkitError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = child.stdout.take().map(|out| tokio::spawn(forward_stdout(out)));
    let stderr = child.stderr.take().map(|err| tokio::spawn(collect_stderr(err)));

    let status = child.wait().await?;

    if let Some(task) = stdout {
        let _ = task.await;
    }
    let stderr = match stderr {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    tracing::debug!(command = %command, %status, "Finished");

    Ok(Finished {
        command,
        status,
        stderr,
    })
}

async fn forward_stdout(out: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(out).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(target: "cdvtask::toolkit::output", "{}", line);
    }
}

async fn collect_stderr(err: impl AsyncRead + Unpin) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL);
    let mut lines = BufReader::new(err).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!(target: "cdvtask::toolkit::output", "{}", line);
        if tail.len() == STDERR_TAIL {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into()
}

fn describe(program: &str, args: &[OsString]) -> String {
    let mut command = program.to_string();
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}
