//! snipbox server entry point.

use snipbox_core::Orchestrator;
use snipbox_server::{http, AppState, ServerConfig};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("snipbox_server=info".parse()?)
                .add_directive("snipbox_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting snipbox server");

    // Load configuration from environment
    let config = ServerConfig::from_env();
    tracing::info!(?config, "Configuration loaded");

    // Warn-only so the server still starts while paths are being provisioned
    config.validate_warn();

    let registry = config.registry()?;
    tracing::info!(languages = ?registry.languages(), "Language pipelines registered");

    let orchestrator = Orchestrator::new(registry, &config.scratch_root);
    let router = http::build_router(
        AppState::new(orchestrator, config.shell_timeout),
        config.enable_shell,
    );

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
    };

    http::serve(router, config.http_addr, shutdown).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
