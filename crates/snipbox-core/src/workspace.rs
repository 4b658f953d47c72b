//! Workspace lifecycle - one private scratch directory per execution.

use crate::error::{ExecError, SetupStage};
use crate::pipeline::LanguagePipeline;
use crate::staging;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkspaceId(Uuid);

impl WorkspaceId {
    /// Create a new random workspace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WorkspaceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A directory owned by exactly one in-flight execution.
///
/// Not `Clone`. [`WorkspaceManager::release`] consumes it; a workspace that
/// is dropped without being released (a cancelled execution) removes its
/// directory in the background.
#[derive(Debug)]
pub struct Workspace {
    id: WorkspaceId,
    root: PathBuf,
    entry_name: String,
    entry_file: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the runtime is invoked against. Populated by
    /// [`WorkspaceManager::stage_entry_point`].
    pub fn entry_file(&self) -> &Path {
        &self.entry_file
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::debug!(workspace_id = %self.id, "Workspace dropped without release, removing");
        let id = self.id;
        let root = std::mem::take(&mut self.root);
        let remove = move || {
            if let Err(e) = std::fs::remove_dir_all(&root) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(workspace_id = %id, error = %e, "Failed to remove abandoned workspace");
                }
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

/// Allocates and tears down workspaces under a shared scratch root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    scratch_root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
        }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Create a fresh workspace for `pipeline`, cloning its template if it
    /// has one.
    ///
    /// On failure whatever was created is removed before returning.
    pub async fn acquire(&self, pipeline: &LanguagePipeline) -> Result<Workspace, ExecError> {
        let id = WorkspaceId::new();
        let root = self.scratch_root.join(id.to_string());
        let start = std::time::Instant::now();
        tracing::debug!(
            workspace_id = %id,
            language = pipeline.id(),
            template = pipeline.needs_template_project(),
            "Acquiring workspace"
        );

        // create_dir, not create_dir_all: an existing directory means a
        // collision and must not be shared.
        if let Err(e) = tokio::fs::create_dir(&root).await {
            tracing::error!(workspace_id = %id, path = %root.display(), error = %e, "Failed to create workspace");
            if !self.scratch_root.is_dir() {
                return Err(ExecError::ScratchUnavailable(self.scratch_root.clone()));
            }
            return Err(ExecError::setup(SetupStage::CreateWorkspace, e));
        }

        let entry_name = pipeline.entry_file_name(&id.to_string());
        let workspace = Workspace {
            id,
            entry_file: root.join(&entry_name),
            entry_name,
            root,
            released: false,
        };

        if let Some(template) = pipeline.template() {
            let src = template.to_path_buf();
            let dst = workspace.root.clone();
            let copied = tokio::task::spawn_blocking(move || staging::copy_tree(&src, &dst))
                .await
                .unwrap_or_else(|join_err| Err(io::Error::other(join_err)));

            if let Err(e) = copied {
                tracing::error!(
                    workspace_id = %id,
                    template = %template.display(),
                    error = %e,
                    "Failed to copy template project"
                );
                self.release(workspace).await;
                return Err(ExecError::setup(SetupStage::CopyTemplate, e));
            }
        }

        tracing::debug!(
            workspace_id = %id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Workspace ready"
        );
        Ok(workspace)
    }

    /// Write the submitted code to the workspace entry file.
    ///
    /// The workspace is left in place on failure; the caller releases it.
    pub async fn stage_entry_point(
        &self,
        workspace: &Workspace,
        code: &[u8],
    ) -> Result<(), ExecError> {
        staging::place_entry_point(code, &workspace.root, &workspace.entry_name)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(workspace_id = %workspace.id, error = %e, "Failed to write entry file");
                ExecError::setup(SetupStage::PlaceEntryPoint, e)
            })
    }

    /// Remove the workspace directory tree.
    ///
    /// Never fails: a removal error is logged and otherwise ignored.
    pub async fn release(&self, mut workspace: Workspace) {
        let removed = tokio::fs::remove_dir_all(&workspace.root).await;
        workspace.released = true;
        match removed {
            Ok(()) => {
                tracing::debug!(workspace_id = %workspace.id, "Workspace released");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(workspace_id = %workspace.id, "Workspace already gone");
            }
            Err(e) => {
                tracing::warn!(
                    workspace_id = %workspace.id,
                    path = %workspace.root.display(),
                    error = %e,
                    "Failed to remove workspace directory"
                );
            }
        }
    }
}
