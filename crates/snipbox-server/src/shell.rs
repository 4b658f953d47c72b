//! Raw shell execution for `POST /cmdExec`.
//!
//! Debug-only. This path runs caller text through `sh -c` and shares nothing
//! with the snippet orchestrator: no pipelines, no workspaces. It is only
//! routed when `SNIPBOX_ENABLE_SHELL` is set.

use crate::types::CmdExecResponse;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Maximum output size in bytes (1 MB).
/// Prevents memory exhaustion from commands with huge output.
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Truncate a string to max bytes, preserving UTF-8 boundaries.
fn truncate_output(s: String, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut truncated = s[..end].to_string();
    truncated.push_str("\n... [output truncated]");
    truncated
}

/// Failure to start the shell at all.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ShellSpawnError(#[from] std::io::Error);

/// Run `cmd` via `sh -c`, killing it after `timeout`.
///
/// Non-zero exits and timeouts are reported in `error` next to the
/// captured output; only a failed spawn is an `Err`.
pub async fn exec_command(cmd: &str, timeout: Duration) -> Result<CmdExecResponse, ShellSpawnError> {
    debug!(cmd_len = cmd.len(), "executing shell command");
    trace!(cmd = %cmd, "shell command");

    let child = Command::new("sh")
        .args(["-c", cmd])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => {
            warn!(error = %e, "shell command failed");
            return Ok(CmdExecResponse {
                error: Some(e.to_string()),
                ..Default::default()
            });
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "shell command timed out");
            return Ok(CmdExecResponse {
                error: Some(format!("command timed out after {}s", timeout.as_secs())),
                ..Default::default()
            });
        }
    };

    let stdout = truncate_output(
        String::from_utf8_lossy(&output.stdout).into_owned(),
        MAX_OUTPUT_SIZE,
    );
    let stderr = truncate_output(
        String::from_utf8_lossy(&output.stderr).into_owned(),
        MAX_OUTPUT_SIZE,
    );
    let error = (!output.status.success()).then(|| output.status.to_string());

    debug!(
        exit_code = output.status.code().unwrap_or(-1),
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        "shell command completed"
    );

    Ok(CmdExecResponse {
        stdout,
        stderr,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exec_command_echo() {
        let result = exec_command("echo hello", Duration::from_secs(5)).await.unwrap();
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_exec_command_exit_code() {
        let result = exec_command("echo err >&2; exit 42", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.stderr.trim(), "err");
        assert!(result.error.unwrap().contains("42"));
    }

    #[tokio::test]
    async fn test_exec_command_timeout() {
        let result = exec_command("sleep 5", Duration::from_millis(200))
            .await
            .unwrap();
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[test]
    fn test_truncate_output() {
        let s = "é".repeat(10);
        let t = truncate_output(s, 5);
        assert!(t.starts_with("éé"));
        assert!(t.ends_with("[output truncated]"));
        assert_eq!(truncate_output("short".into(), 100), "short");
    }
}
