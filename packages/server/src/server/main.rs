// Main entry point for API server

use anyhow::{Context, Result};
use server_core::{kernel::ServerDeps, server::build_app, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sql_extraction=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SQL data model extraction API");

    let settings = Settings::load().context("Failed to load configuration")?;
    tracing::info!(
        project = %settings.project_id,
        region = %settings.region,
        backend = ?settings.store_backend,
        "Configuration loaded"
    );

    let deps = ServerDeps::from_settings(&settings)
        .await
        .context("Failed to initialize dependencies")?;

    let app = build_app(deps);

    let addr = format!("0.0.0.0:{}", settings.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", settings.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
