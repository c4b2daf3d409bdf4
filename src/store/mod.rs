//! Persistence for per-user credentials and refresh markers.
//!
//! Two backends sit behind [`StateStore`]: PostgreSQL for deployments and an
//! in-process map for local runs and tests.

pub mod db;
pub mod memory;

pub use db::PgStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Which remote service a credential authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Timeline,
    Feed,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Timeline => "timeline",
            Service::Feed => "feed",
        }
    }
}

/// OAuth tokens a local user holds for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|e| e < Utc::now()).unwrap_or(false)
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Prepare tables or whatever the backend needs before first use.
    async fn migrate(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_credential(
        &self,
        service: Service,
        user_id: &str,
    ) -> Result<Option<Credential>, AppError>;

    /// Insert or replace. A `None` refresh token keeps the stored one.
    async fn put_credential(&self, service: Service, cred: &Credential) -> Result<(), AppError>;

    /// Every user id holding a credential for `service`.
    async fn list_users(&self, service: Service) -> Result<Vec<String>, AppError>;

    /// Record the user's current refresh marker, replacing any earlier one.
    async fn put_refresh_marker(&self, user_id: &str, marker_id: &str) -> Result<(), AppError>;

    /// Delete the marker and report whether it existed.
    async fn take_refresh_marker(&self, marker_id: &str) -> Result<bool, AppError>;
}
