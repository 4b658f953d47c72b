//! Process supervision for staged snippets.
//!
//! One call to [`run`] drives a single child process through
//! `Starting -> Running -> {Completed, TimedOut}`; a child that never starts
//! is reported as [`ExecError::SpawnFailed`].

use crate::error::ExecError;
use crate::pipeline::LanguagePipeline;
use crate::workspace::Workspace;
use bytes::Bytes;
use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// How long pipe readers may keep going once the child has exited. Only a
/// process that left the child's group can hold the pipes open this long.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Classified result of one supervised process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Process exited with a success status.
    Success,
    /// Process exited with a failure status; `exit_code` is `None` when it
    /// was terminated by a signal.
    RuntimeError { exit_code: Option<i32> },
    /// Pipeline budget elapsed and the process was killed.
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Exit code as reported to callers (0 on success, -1 when unknown).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::RuntimeError { exit_code } => exit_code.unwrap_or(-1),
            Self::TimedOut => -1,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::RuntimeError { .. } => write!(f, "runtime_error"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Captured output and classification of a finished run.
#[derive(Debug, Clone)]
pub struct SupervisedRun {
    pub stdout: Bytes,
    pub stderr: Bytes,
    pub outcome: Outcome,
}

/// The child's process group. Everything the snippet starts lives in it and
/// is killed when this is dropped, including when the run is cancelled.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: killpg only sends a signal to the group we created.
            let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
            if rc == -1 {
                let err = io::Error::last_os_error();
                // ESRCH: the group is already empty.
                if err.raw_os_error() != Some(libc::ESRCH) {
                    warn!(pgid, error = %err, "Failed to kill process group");
                }
            } else {
                trace!(pgid, "Process group killed");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Run the pipeline's runtime against the workspace entry file.
///
/// The working directory is set on this one spawned command; the service's
/// own current directory is never touched, so concurrent runs stay
/// independent. The timeout clock belongs to this call alone.
///
/// The outcome is decided by the child's exit status, not by the pipes
/// closing. When the child is done (or killed) its whole process group is
/// killed, so nothing it started outlives the run.
pub async fn run(pipeline: &LanguagePipeline, workspace: &Workspace) -> Result<SupervisedRun, ExecError> {
    let argv = pipeline.argv(workspace.entry_file());
    let Some((program, args)) = argv.split_first() else {
        return Err(ExecError::SpawnFailed {
            program: pipeline.id().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    debug!(
        workspace_id = %workspace.id(),
        program = %program,
        timeout_ms = pipeline.timeout().as_millis() as u64,
        "Starting process"
    );

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(workspace.root())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| {
        warn!(workspace_id = %workspace.id(), program = %program, error = %e, "Failed to spawn process");
        ExecError::SpawnFailed {
            program: program.clone(),
            source: e,
        }
    })?;

    let mut group = ProcessGroup { pgid: child.id() };
    trace!(workspace_id = %workspace.id(), pid = ?child.id(), "Process running");

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let outcome = {
        // Both pipes are drained while waiting so a chatty child can never
        // block on a full pipe buffer.
        let drains = async {
            tokio::join!(
                drain(stdout_pipe.as_mut(), &mut stdout),
                drain(stderr_pipe.as_mut(), &mut stderr),
            );
        };
        tokio::pin!(drains);
        let mut drained = false;

        let waited = tokio::time::timeout(pipeline.timeout(), async {
            loop {
                tokio::select! {
                    status = child.wait() => break status,
                    _ = &mut drains, if !drained => drained = true,
                }
            }
        })
        .await;

        let outcome = match waited {
            Ok(Ok(status)) if status.success() => Outcome::Success,
            Ok(Ok(status)) => Outcome::RuntimeError {
                exit_code: status.code(),
            },
            Ok(Err(e)) => {
                warn!(workspace_id = %workspace.id(), error = %e, "Failed to wait for process");
                Outcome::RuntimeError { exit_code: None }
            }
            Err(_) => {
                warn!(
                    workspace_id = %workspace.id(),
                    timeout_ms = pipeline.timeout().as_millis() as u64,
                    "Process timed out, killing"
                );
                Outcome::TimedOut
            }
        };

        // Stragglers go down with the group; that closes their pipe ends.
        group.kill();
        if outcome == Outcome::TimedOut {
            if let Err(e) = child.kill().await {
                warn!(workspace_id = %workspace.id(), error = %e, "Failed to kill timed out process");
            }
        }

        if !drained && tokio::time::timeout(OUTPUT_GRACE, &mut drains).await.is_err() {
            warn!(workspace_id = %workspace.id(), "Output pipes still open after exit, discarding the rest");
        }
        outcome
    };

    debug!(
        workspace_id = %workspace.id(),
        outcome = %outcome,
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        "Process finished"
    );

    Ok(SupervisedRun {
        stdout: Bytes::from(stdout),
        stderr: Bytes::from(stderr),
        outcome,
    })
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    if let Some(pipe) = pipe {
        if let Err(e) = pipe.read_to_end(buf).await {
            debug!(error = %e, "pipe read failed");
        }
    }
}
