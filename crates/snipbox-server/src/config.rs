//! Configuration for the snipbox server.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use snipbox_core::{
    ConfigError as PipelineConfigError, PipelineRegistry, DEFAULT_JS_TIMEOUT,
    DEFAULT_TS_TEMPLATE, DEFAULT_TS_TIMEOUT,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default budget for the debug shell endpoint.
pub const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the snipbox server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory under which per-execution workspaces are created.
    pub scratch_root: PathBuf,

    /// Template project cloned into every TypeScript workspace.
    pub ts_template: PathBuf,

    /// Budget for JavaScript runs (default: 60s).
    pub js_timeout: Duration,

    /// Budget for TypeScript runs (default: 30s).
    pub ts_timeout: Duration,

    /// HTTP server bind address.
    pub http_addr: SocketAddr,

    /// Expose `POST /cmdExec` (default: false). Never enable in production.
    pub enable_shell: bool,

    /// Budget for `POST /cmdExec` commands.
    pub shell_timeout: Duration,
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("scratch root not found: {0}")]
    MissingScratchRoot(PathBuf),

    #[error("scratch root is read-only: {0}")]
    ReadOnlyScratchRoot(PathBuf),

    #[error("typescript template not found: {0}")]
    MissingTemplate(PathBuf),

    #[error("invalid pipeline configuration: {0}")]
    Pipeline(#[from] PipelineConfigError),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from("/mnt/persistent"),
            ts_template: PathBuf::from(DEFAULT_TS_TEMPLATE),
            js_timeout: DEFAULT_JS_TIMEOUT,
            ts_timeout: DEFAULT_TS_TIMEOUT,
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 8080),
            enable_shell: false,
            shell_timeout: DEFAULT_SHELL_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SNIPBOX_SCRATCH_ROOT` | `/mnt/persistent` |
    /// | `SNIPBOX_TS_TEMPLATE` | `/tmp/dummy-pkg-ts` |
    /// | `SNIPBOX_JS_TIMEOUT_SECS` | `60` |
    /// | `SNIPBOX_TS_TIMEOUT_SECS` | `30` |
    /// | `SNIPBOX_HTTP_HOST` | `0.0.0.0` |
    /// | `SNIPBOX_HTTP_PORT` | `8080` |
    /// | `SNIPBOX_ENABLE_SHELL` | `false` |
    /// | `SNIPBOX_SHELL_TIMEOUT_SECS` | `30` |
    pub fn from_env() -> Self {
        let default = Self::default();

        let http_host: IpAddr = std::env::var("SNIPBOX_HTTP_HOST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default.http_addr.ip());

        let http_port: u16 = std::env::var("SNIPBOX_HTTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default.http_addr.port());

        Self {
            scratch_root: std::env::var("SNIPBOX_SCRATCH_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_root),
            ts_template: std::env::var("SNIPBOX_TS_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or(default.ts_template),
            js_timeout: secs_from_env("SNIPBOX_JS_TIMEOUT_SECS").unwrap_or(default.js_timeout),
            ts_timeout: secs_from_env("SNIPBOX_TS_TIMEOUT_SECS").unwrap_or(default.ts_timeout),
            http_addr: SocketAddr::new(http_host, http_port),
            enable_shell: std::env::var("SNIPBOX_ENABLE_SHELL")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.enable_shell),
            shell_timeout: secs_from_env("SNIPBOX_SHELL_TIMEOUT_SECS")
                .unwrap_or(default.shell_timeout),
        }
    }

    /// Build the language pipeline registry described by this configuration.
    pub fn registry(&self) -> Result<PipelineRegistry, ConfigError> {
        Ok(PipelineRegistry::builtin(
            &self.ts_template,
            self.js_timeout,
            self.ts_timeout,
        )?)
    }

    /// Validate that the scratch root and template exist.
    ///
    /// Call this at startup to get clear error messages about missing paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scratch_root.is_dir() {
            return Err(ConfigError::MissingScratchRoot(self.scratch_root.clone()));
        }

        let readonly = std::fs::metadata(&self.scratch_root)
            .map(|m| m.permissions().readonly())
            .unwrap_or(false);
        if readonly {
            return Err(ConfigError::ReadOnlyScratchRoot(self.scratch_root.clone()));
        }

        if !self.ts_template.is_dir() {
            return Err(ConfigError::MissingTemplate(self.ts_template.clone()));
        }

        Ok(())
    }

    /// Validate configuration but only log warnings instead of failing.
    ///
    /// Use this for development environments where paths may not exist yet.
    pub fn validate_warn(&self) {
        if let Err(e) = self.validate() {
            tracing::warn!(error = %e, "Configuration check failed");
        }
        if self.enable_shell {
            tracing::warn!("POST /cmdExec is enabled: arbitrary shell commands are accepted");
        }
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
