use anyhow::Context;
use readmegen::{api, AppState, Config};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    if config.google_api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set, generation requests will fail");
    }

    let state = AppState::from_config(&config).context("failed to build application state")?;
    let metrics = state.metrics().clone();
    let app = api::router(state);

    let address = config.bind_address();
    info!("readmegen server starting...");
    info!("Model: {}", config.model);
    info!(
        "Rate limit: {} requests per {}s per client",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    metrics.report().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
