// src/main.rs
use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deposit_tracker::backend::{self, auth, AppState};
use deposit_tracker::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    if config.ephemeral_secret {
        warn!("SECRET_KEY is not set; sessions will not survive a restart");
    }

    let store = backend::open_store(&config).await.context("opening the store")?;
    auth::ensure_admin(store.as_ref(), &config).await?;

    info!("Starting Bank Deposit Management server...");
    backend::run_server(AppState::new(store, config)).await
}
