use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use chrono_banana::{
    config::Config,
    gemini::{mask_api_key, validate_api_key, GeminiClient, GenerationBackend, PlaceholderBackend},
    orchestrator::ImageGenerator,
    rate_limit::SystemClock,
    routes::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let key_check = validate_api_key(config.api_key.as_deref());

    let backend: Arc<dyn GenerationBackend> = match &config.api_key {
        Some(key) => {
            tracing::info!("Using API key: {} ({})", mask_api_key(key), key_check.message);
            Arc::new(GeminiClient::new(key.clone(), config.api_base.clone()))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, running in demo mode with placeholder images");
            Arc::new(PlaceholderBackend)
        }
    };

    let generator = ImageGenerator::new(
        backend,
        Arc::new(SystemClock),
        config.dispatch_delay,
        config.image_model.clone(),
        config.text_model.clone(),
    );
    let app = router(AppState::new(Arc::new(generator), key_check));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, delay_ms = config.dispatch_delay.as_millis() as u64, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
