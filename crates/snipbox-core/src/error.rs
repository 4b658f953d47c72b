//! Error types for snipbox-core.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for snipbox-core operations.
pub type Result<T> = std::result::Result<T, ExecError>;

/// Step of workspace preparation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// Creating the workspace directory.
    CreateWorkspace,
    /// Cloning the template project into the workspace.
    CopyTemplate,
    /// Writing the submitted code to the entry file.
    PlaceEntryPoint,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateWorkspace => write!(f, "create workspace"),
            Self::CopyTemplate => write!(f, "copy template project"),
            Self::PlaceEntryPoint => write!(f, "write entry file"),
        }
    }
}

/// Errors that can occur while executing a snippet.
///
/// Messages are safe to show to callers: they never contain workspace ids
/// or scratch paths. Those are recorded in logs instead.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Language is not in the pipeline registry.
    #[error("language not supported: {0}")]
    NotSupported(String),

    /// Workspace or staging failure; no process was spawned.
    #[error("workspace setup failed: could not {stage}")]
    Setup {
        /// Which preparation step failed
        stage: SetupStage,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Scratch root is missing or unusable.
    #[error("scratch storage unavailable")]
    ScratchUnavailable(PathBuf),

    /// Runtime binary could not be started.
    #[error("failed to start {program}: {}", .source.kind())]
    SpawnFailed {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    pub(crate) fn setup(stage: SetupStage, source: std::io::Error) -> Self {
        Self::Setup { stage, source }
    }
}

/// Errors raised while building pipelines or the registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two pipelines registered with the same id.
    #[error("duplicate pipeline id: {0}")]
    DuplicatePipeline(String),

    /// Pipeline command has no program.
    #[error("pipeline {0} has an empty command")]
    EmptyCommand(String),

    /// Pipeline command never references the entry file.
    #[error("pipeline {0} command does not reference {{entry}}")]
    MissingEntryPlaceholder(String),

    /// Pipeline timeout is zero.
    #[error("pipeline {0} has a zero timeout")]
    ZeroTimeout(String),

    /// Template directory does not exist.
    #[error("template project not found: {0}")]
    MissingTemplate(PathBuf),
}
