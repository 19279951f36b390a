use std::net::SocketAddr;

use anyhow::Context;

use craftmart_infra::config::{AppConfig, Environment};
use craftmart_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = std::env::var("APP_ENV")
        .ok()
        .and_then(|v| v.parse::<Environment>().ok())
        .unwrap_or_default();
    craftmart_observability::init(LogFormat::for_environment(environment.is_production()));

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = craftmart_api::app::build_app(&config)
        .await
        .context("failed to initialize services")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        "server running in {:?} mode on {}",
        config.environment,
        listener.local_addr()?
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
