//! # snipbox-core
//!
//! Execution orchestration for snipbox: turns a `(language, code)` pair into
//! an isolated, time-bounded subprocess run.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      snipbox-core                        │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐    │
//! │  │  Orchestrator   │────▶│  PipelineRegistry        │    │
//! │  │   - execute()   │     │  (read-only, Arc-shared) │    │
//! │  └─────────────────┘     └──────────────────────────┘    │
//! │           │                                              │
//! │           ▼                                              │
//! │  ┌─────────────────┐     ┌──────────────────────────┐    │
//! │  │WorkspaceManager │────▶│  staging                 │    │
//! │  │   - acquire()   │     │  copy_tree / copy_file   │    │
//! │  │   - release()   │     │  place_entry_point       │    │
//! │  └─────────────────┘     └──────────────────────────┘    │
//! │           │                                              │
//! │           ▼                                              │
//! │  ┌─────────────────┐                                     │
//! │  │  supervisor     │  spawn with per-call cwd,           │
//! │  │   - run()       │  timeout, kill, capture             │
//! │  └─────────────────┘                                     │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use snipbox_core::{ExecutionRequest, Orchestrator, PipelineRegistry};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = PipelineRegistry::builtin(
//!     "/tmp/dummy-pkg-ts",
//!     Duration::from_secs(60),
//!     Duration::from_secs(30),
//! )?;
//! let orchestrator = Orchestrator::new(registry, "/mnt/persistent");
//!
//! let result = orchestrator
//!     .execute(&ExecutionRequest::new("javascript", "console.log('hi')"))
//!     .await?;
//! println!("{} ({:?})", result.stdout_lossy(), result.elapsed);
//! # Ok(())
//! # }
//! ```

mod error;
mod orchestrator;
mod pipeline;
pub mod staging;
mod supervisor;
mod workspace;

pub use error::{ConfigError, ExecError, Result, SetupStage};
pub use orchestrator::{ExecutionRequest, ExecutionResult, Orchestrator};
pub use pipeline::{
    LanguagePipeline, PipelineRegistry, PipelineRegistryBuilder, DEFAULT_JS_TIMEOUT,
    DEFAULT_TS_TEMPLATE, DEFAULT_TS_TIMEOUT, ENTRY_PLACEHOLDER,
};
pub use supervisor::{run, Outcome, SupervisedRun};
pub use workspace::{Workspace, WorkspaceId, WorkspaceManager};
