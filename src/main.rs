use tracing_subscriber::EnvFilter;

use program_search::config::Config;
use program_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Embedding provider: {} ({}, model {})",
        config.embedding.provider,
        config.embedding.base_url,
        config.embedding.model
    );

    let state = AppState::new(config.clone()).await?;
    tracing::info!("Program store: {}", state.store.backend_name());

    let app = program_search::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
