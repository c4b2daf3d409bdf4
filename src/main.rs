use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use glassfeed::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glassfeed=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("glassfeed v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    let addr = format!("{}:{}", config.host, config.port);
    let state: SharedState = Arc::new(AppState::connect(config).await?);
    info!("State store ready ✓");

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready ✓");
    axum::serve(listener, app).await?;

    Ok(())
}
