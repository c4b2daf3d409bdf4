pub mod accounts;
pub mod actions;
pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod feed;
pub mod flash;
pub mod providers;
pub mod store;
pub mod sync;
pub mod timeline;

pub use config::Config;
pub use error::AppError;

use std::sync::Arc;
use tracing::warn;

use crypto::CryptoEngine;
use flash::FlashMessages;
use providers::{FeedProvider, TimelineProvider};
use store::{MemoryStore, PgStore, StateStore};

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn StateStore>,
    pub crypto: Arc<CryptoEngine>,
    pub http: reqwest::Client,
    pub timeline_auth: TimelineProvider,
    pub feed_auth: FeedProvider,
    pub flash: FlashMessages,
    pub sync: sync::SyncSettings,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build state from config, connecting to PostgreSQL when `DATABASE_URL` is set.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let crypto = Arc::new(CryptoEngine::new(&config.master_key, &config.hmac_secret)?);
        let store: Arc<dyn StateStore> = match &config.database_url {
            Some(url) => Arc::new(PgStore::new(url, crypto.clone()).await?),
            None => {
                warn!("DATABASE_URL not set; credentials are kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        store.migrate().await?;
        Self::with_store(config, store, crypto)
    }

    pub fn with_store(
        config: Config,
        store: Arc<dyn StateStore>,
        crypto: Arc<CryptoEngine>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("glassfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            timeline_auth: TimelineProvider::new(&config, http.clone()),
            feed_auth: FeedProvider::new(&config, http.clone()),
            sync: config.sync_settings(),
            flash: FlashMessages::default(),
            config,
            store,
            crypto,
            http,
        })
    }
}
