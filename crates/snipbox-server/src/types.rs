//! Request and response envelopes for the HTTP API.

use serde::{Deserialize, Serialize};
use snipbox_core::ExecutionResult;

/// Body of `POST /code/exec`.
#[derive(Debug, Deserialize)]
pub struct CodeExecRequest {
    /// Language id (javascript, typescript).
    pub language: String,

    /// Source to run.
    pub code: String,
}

/// Successful response of `POST /code/exec`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecResponse {
    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Wall-clock run time in milliseconds, as a string.
    pub exec_time: String,

    /// `success` or `runtime_error`.
    pub outcome: String,

    /// Process exit code (0 = success).
    pub exit_code: i32,
}

impl From<&ExecutionResult> for CodeExecResponse {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            stdout: result.stdout_lossy(),
            stderr: result.stderr_lossy(),
            exec_time: result.elapsed.as_millis().to_string(),
            outcome: result.outcome.to_string(),
            exit_code: result.outcome.exit_code(),
        }
    }
}

/// Response of `POST /cmdExec`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CmdExecResponse {
    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Failure description, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `Health check OK`.
    pub status: String,

    /// Service name.
    pub service: String,

    /// Registered language ids.
    pub languages: Vec<String>,

    /// Process start time (RFC 3339).
    pub started_at: String,
}

/// Error envelope for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
