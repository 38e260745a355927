use std::sync::Arc;

use anyhow::Context;
use gametaverns_bgg::BggClient;
use gametaverns_server::{AppConfig, AppState, app, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gametaverns_server=info,gametaverns_bgg=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("data directory: {}", config.data_dir.display());

    let db = storage::init_db(&config.data_dir)?;
    tracing::info!("database initialized");

    if !config.registration_open {
        tracing::info!("registration is closed");
    }

    let bgg = BggClient::new(config.bgg.clone()).context("building BGG client")?;
    tracing::info!("BGG API base: {}", bgg.config().base_url);

    let port = config.port;
    let base_url = config.base_url.clone();
    let state = AppState {
        db,
        config,
        bgg: Arc::new(bgg),
    };

    tracing::info!("starting server at {base_url}");
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
