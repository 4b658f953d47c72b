//! Execution orchestrator - the entry point for running one snippet.

use crate::error::ExecError;
use crate::pipeline::{LanguagePipeline, PipelineRegistry};
use crate::supervisor::{self, Outcome};
use crate::workspace::{Workspace, WorkspaceManager};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A validated request to run `code` as `language`.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub language: String,
    pub code: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
        }
    }
}

/// Result of one execution.
///
/// `elapsed` covers the supervised process run only; workspace setup and
/// teardown are excluded.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: Bytes,
    pub stderr: Bytes,
    pub outcome: Outcome,
    pub elapsed: Duration,
    /// Budget the run was held to.
    pub timeout: Duration,
}

impl ExecutionResult {
    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Turns `(language, code)` into an isolated, time-bounded run.
///
/// Cheap to clone; clones share the same read-only registry. Safe to call
/// concurrently: each call owns its own workspace and timeout.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<PipelineRegistry>,
    workspaces: WorkspaceManager,
}

impl Orchestrator {
    pub fn new(registry: PipelineRegistry, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            registry: Arc::new(registry),
            workspaces: WorkspaceManager::new(scratch_root),
        }
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Execute a snippet.
    ///
    /// Unknown languages are rejected before anything touches the disk. The
    /// workspace is released on every path; a failed release is logged and
    /// does not change the returned value.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecError> {
        let pipeline = self.registry.lookup(&request.language).inspect_err(|_| {
            tracing::info!(language = %request.language, "Rejected unsupported language");
        })?;

        tracing::info!(
            language = pipeline.id(),
            code_len = request.code.len(),
            "Executing snippet"
        );
        tracing::trace!(code = %request.code, "snippet source");

        let workspace = self.workspaces.acquire(pipeline).await?;
        let result = self.run_in(pipeline, &workspace, request).await;
        self.workspaces.release(workspace).await;
        result
    }

    async fn run_in(
        &self,
        pipeline: &LanguagePipeline,
        workspace: &Workspace,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecError> {
        self.workspaces
            .stage_entry_point(workspace, request.code.as_bytes())
            .await?;

        let start = Instant::now();
        let run = supervisor::run(pipeline, workspace).await?;
        let elapsed = start.elapsed();

        tracing::info!(
            workspace_id = %workspace.id(),
            language = pipeline.id(),
            outcome = %run.outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Execution finished"
        );

        Ok(ExecutionResult {
            stdout: run.stdout,
            stderr: run.stderr,
            outcome: run.outcome,
            elapsed,
            timeout: pipeline.timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ENTRY_PLACEHOLDER;
    use std::fs;
    use tempfile::TempDir;

    fn orchestrator(scratch: &TempDir, template: &TempDir, timeout: Duration) -> Orchestrator {
        let registry = PipelineRegistry::builder()
            .pipeline(LanguagePipeline::new(
                "shell",
                ".sh",
                ["sh", ENTRY_PLACEHOLDER],
                timeout,
            ))
            .pipeline(
                LanguagePipeline::new("templated", ".sh", ["sh", ENTRY_PLACEHOLDER], timeout)
                    .with_template(template.path()),
            )
            .build()
            .unwrap();
        Orchestrator::new(registry, scratch.path())
    }

    fn template_dir() -> TempDir {
        let template = TempDir::new().unwrap();
        fs::write(template.path().join("greeting.txt"), "from-template").unwrap();
        template
    }

    fn scratch_entries(scratch: &TempDir) -> usize {
        fs::read_dir(scratch.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (scratch, template) = (TempDir::new().unwrap(), template_dir());
        let orch = orchestrator(&scratch, &template, Duration::from_secs(5));

        let result = orch
            .execute(&ExecutionRequest::new("shell", "printf 'hello world'"))
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.stdout_lossy(), "hello world");
        assert!(result.stderr.is_empty());
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_execute_template_pipeline_sees_template() {
        let (scratch, template) = (TempDir::new().unwrap(), template_dir());
        let orch = orchestrator(&scratch, &template, Duration::from_secs(5));

        let result = orch
            .execute(&ExecutionRequest::new("templated", "cat greeting.txt; ls index.sh"))
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.stdout_lossy(), "from-templateindex.sh\n");
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_execute_unsupported_creates_nothing() {
        let (scratch, template) = (TempDir::new().unwrap(), template_dir());
        let orch = orchestrator(&scratch, &template, Duration::from_secs(5));

        let err = orch
            .execute(&ExecutionRequest::new("python", "print('hi')"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NotSupported(ref l) if l == "python"));
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_execute_runtime_error_cleans_up() {
        let (scratch, template) = (TempDir::new().unwrap(), template_dir());
        let orch = orchestrator(&scratch, &template, Duration::from_secs(5));

        let result = orch
            .execute(&ExecutionRequest::new("templated", "echo before; exit 3"))
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::RuntimeError { exit_code: Some(3) });
        assert_eq!(result.stdout_lossy(), "before\n");
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_execute_timeout_cleans_up() {
        let (scratch, template) = (TempDir::new().unwrap(), template_dir());
        let orch = orchestrator(&scratch, &template, Duration::from_secs(1));

        let start = Instant::now();
        let result = orch
            .execute(&ExecutionRequest::new("templated", "while true; do :; done"))
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(3));
        assert!(result.elapsed >= Duration::from_secs(1));
        assert_eq!(result.timeout, Duration::from_secs(1));
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_cancelled_execute_cleans_up() {
        let (scratch, template) = (TempDir::new().unwrap(), template_dir());
        let orch = orchestrator(&scratch, &template, Duration::from_secs(10));

        let request = ExecutionRequest::new("templated", "sleep 5");
        let cancelled = tokio::time::timeout(Duration::from_millis(300), orch.execute(&request)).await;
        assert!(cancelled.is_err());

        for _ in 0..100 {
            if scratch_entries(&scratch) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_execute_spawn_failure_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let registry = PipelineRegistry::builder()
            .pipeline(LanguagePipeline::new(
                "ghost",
                ".g",
                ["snipbox-no-such-runtime", ENTRY_PLACEHOLDER],
                Duration::from_secs(1),
            ))
            .build()
            .unwrap();
        let orch = Orchestrator::new(registry, scratch.path());

        let err = orch
            .execute(&ExecutionRequest::new("ghost", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::SpawnFailed { .. }));
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_execute_missing_template_is_setup_error() {
        let scratch = TempDir::new().unwrap();
        let registry = PipelineRegistry::builder()
            .pipeline(
                LanguagePipeline::new("t", ".sh", ["sh", ENTRY_PLACEHOLDER], Duration::from_secs(1))
                    .with_template(scratch.path().join("absent")),
            )
            .build()
            .unwrap();
        let orch = Orchestrator::new(registry, scratch.path());

        let err = orch
            .execute(&ExecutionRequest::new("t", "echo hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Setup { .. }));
        assert_eq!(scratch_entries(&scratch), 0);
    }
}
