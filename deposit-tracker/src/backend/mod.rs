pub mod auth;
pub mod error;
pub mod forms;
mod handlers;
mod routes;
pub mod session;
pub mod views;

pub use error::AppError;

use axum::{extract::FromRef, routing::get, Router};
use axum_extra::extract::cookie::Key;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Backend, Config};
use crate::database::db::{JsonStore, SqliteStore};
use crate::database::models::settings::{CURRENCY_SYMBOL_KEY, DEFAULT_TAX_RATE_KEY};
use crate::database::models::{NewBank, Settings};
use crate::database::{Store, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    key: Key,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let key = Key::derive_from(config.secret_key.as_bytes());
        AppState {
            store,
            config: Arc::new(config),
            key,
        }
    }

    /// The user's stored settings, falling back to the configured defaults.
    pub async fn settings_for(&self, user_id: i64) -> Result<Settings, StoreError> {
        let default_tax_rate = match self.store.get_setting(user_id, DEFAULT_TAX_RATE_KEY).await? {
            Some(raw) => Decimal::from_str(&raw).unwrap_or_else(|_| {
                warn!(user_id, value = %raw, "ignoring unparsable stored tax rate");
                self.config.default_tax_rate
            }),
            None => self.config.default_tax_rate,
        };
        let currency_symbol = self
            .store
            .get_setting(user_id, CURRENCY_SYMBOL_KEY)
            .await?
            .unwrap_or_else(|| self.config.currency_symbol.clone());

        Ok(Settings {
            default_tax_rate,
            currency_symbol,
        })
    }

    /// Banks offered on the deposit form: the user's own, or the configured
    /// defaults when the user has none.
    pub async fn bank_choices(&self, user_id: i64) -> Result<Vec<NewBank>, StoreError> {
        let banks = self.store.list_banks(user_id).await?;
        if banks.is_empty() {
            return Ok(self.config.default_banks.clone());
        }
        Ok(banks
            .into_iter()
            .map(|b| NewBank {
                name: b.name,
                default_interest_rate: b.default_interest_rate,
            })
            .collect())
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = match &config.backend {
        Backend::Sqlite { url } => {
            info!(%url, "opening SQLite store");
            Arc::new(SqliteStore::open(url).await?)
        }
        Backend::Json { dir } => {
            info!(dir = %dir.display(), "opening JSON store");
            Arc::new(JsonStore::open(dir.clone()).await?)
        }
    };
    Ok(store)
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::page_routes())
        .merge(routes::api_routes())
        .fallback(handlers::not_found)
        .with_state(state)
}

pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr;
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
