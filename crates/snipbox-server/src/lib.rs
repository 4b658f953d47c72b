//! # snipbox-server
//!
//! HTTP front end for snipbox. Decodes the JSON envelope, hands a
//! `(language, code)` pair to the [`snipbox_core::Orchestrator`] and encodes
//! the result or a classified error.

mod config;
mod error;
pub mod http;
pub mod shell;
pub mod types;

pub use config::{ConfigError, ServerConfig, DEFAULT_SHELL_TIMEOUT};
pub use error::ApiError;
pub use http::{build_router, serve, AppState};
