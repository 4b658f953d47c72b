//! HTTP transport.
//!
//! ## Endpoints
//!
//! - `POST /code/exec` - Run a snippet, returns `{stdout, stderr, execTime}`
//! - `GET /health` - Health check
//! - `POST /cmdExec` - Raw shell command (only when enabled in config)

use crate::error::ApiError;
use crate::shell;
use crate::types::{CodeExecRequest, CodeExecResponse, HealthResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use snipbox_core::{ExecutionRequest, Orchestrator, Outcome};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Orchestrator,
    started_at: DateTime<Utc>,
    shell_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, shell_timeout: Duration) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
            shell_timeout,
        }
    }
}

/// Build the HTTP router.
///
/// `/cmdExec` is only routed when `enable_shell` is set; otherwise it is a
/// plain 404.
pub fn build_router(state: AppState, enable_shell: bool) -> Router {
    tracing::debug!(enable_shell, "Building HTTP router");

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/code/exec", post(code_exec_handler));

    if enable_shell {
        router = router.route("/cmdExec", post(cmd_exec_handler));
    }

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::trace!("Health check request");
    Json(HealthResponse {
        status: "Health check OK".into(),
        service: "snipbox".into(),
        languages: state
            .orchestrator
            .registry()
            .languages()
            .into_iter()
            .map(String::from)
            .collect(),
        started_at: state.started_at.to_rfc3339(),
    })
}

/// Truncate sensitive content for logging.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &s[..end], s.len())
}

async fn code_exec_handler(
    State(state): State<AppState>,
    payload: Result<Json<CodeExecRequest>, JsonRejection>,
) -> Result<Json<CodeExecResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Invalid exec request body");
        ApiError::InvalidJson
    })?;

    tracing::info!(
        language = %req.language,
        code = %truncate_for_log(&req.code, 100),
        "Code execution request"
    );

    let request = ExecutionRequest::new(req.language, req.code);
    let result = state.orchestrator.execute(&request).await?;

    if result.outcome == Outcome::TimedOut {
        return Err(ApiError::TimedOut(result.timeout));
    }
    Ok(Json(CodeExecResponse::from(&result)))
}

async fn cmd_exec_handler(State(state): State<AppState>, body: String) -> Response {
    tracing::warn!(cmd = %truncate_for_log(&body, 100), "Raw shell command request");

    match shell::exec_command(&body, state.shell_timeout).await {
        Ok(response) => {
            let status = if response.error.is_some() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            };
            (status, Json(response)).into_response()
        }
        Err(e) => ApiError::Command(e.to_string()).into_response(),
    }
}

/// Start the HTTP server.
///
/// This function runs until the server is shut down via the provided
/// shutdown signal.
pub async fn serve(
    router: Router,
    addr: std::net::SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!(%addr, "TCP listener bound");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
