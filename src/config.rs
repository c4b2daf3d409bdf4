use anyhow::{Context, Result};
use std::time::Duration;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Public URL this service is reachable at.
    pub base_url: String,

    // ── Storage ─────────────────────────────────────────────────────────
    /// PostgreSQL connection string. Without it credentials live in memory.
    pub database_url: Option<String>,

    // ── Crypto ──────────────────────────────────────────────────────────
    /// 32-byte base64-encoded master key for AES-256-GCM token encryption.
    pub master_key: String,
    /// 32-byte base64-encoded HMAC key for OAuth state and session signing.
    pub hmac_secret: String,

    // ── Timeline service ────────────────────────────────────────────────
    pub timeline_client_id: String,
    pub timeline_client_secret: String,
    pub timeline_api_url: String,
    pub timeline_upload_url: String,
    pub timeline_auth_url: String,
    pub timeline_token_url: String,
    pub timeline_userinfo_url: String,
    /// Where the timeline service posts action notifications.
    pub notify_callback_url: String,
    pub contact_id: String,

    // ── Feed service ────────────────────────────────────────────────────
    pub feed_client_id: String,
    pub feed_client_secret: String,
    pub feed_api_url: String,

    // ── Sync behaviour ──────────────────────────────────────────────────
    pub entries_per_refresh: u32,
    pub bundle_id: String,
    pub cover_image_url: String,
    pub image_fetch_timeout: Duration,
    pub broadcast_user_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("Invalid PORT")?,
            notify_callback_url: std::env::var("NOTIFY_CALLBACK_URL")
                .unwrap_or_else(|_| format!("{base_url}/subscriptions")),
            base_url,

            database_url: std::env::var("DATABASE_URL").ok(),
            master_key: std::env::var("MASTER_KEY")
                .context("MASTER_KEY is required (32 bytes, base64)")?,
            hmac_secret: std::env::var("HMAC_SECRET")
                .context("HMAC_SECRET is required (32 bytes, base64)")?,

            timeline_client_id: std::env::var("TIMELINE_CLIENT_ID")
                .context("TIMELINE_CLIENT_ID is required")?,
            timeline_client_secret: std::env::var("TIMELINE_CLIENT_SECRET")
                .context("TIMELINE_CLIENT_SECRET is required")?,
            timeline_api_url: std::env::var("TIMELINE_API_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/mirror/v1".into()),
            timeline_upload_url: std::env::var("TIMELINE_UPLOAD_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/upload/mirror/v1".into()),
            timeline_auth_url: std::env::var("TIMELINE_AUTH_URL")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".into()),
            timeline_token_url: std::env::var("TIMELINE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".into()),
            timeline_userinfo_url: std::env::var("TIMELINE_USERINFO_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v2/userinfo".into()),
            contact_id: std::env::var("CONTACT_ID").unwrap_or_else(|_| "glassfeed".into()),

            feed_client_id: std::env::var("FEED_CLIENT_ID")
                .context("FEED_CLIENT_ID is required")?,
            feed_client_secret: std::env::var("FEED_CLIENT_SECRET")
                .context("FEED_CLIENT_SECRET is required")?,
            feed_api_url: std::env::var("FEED_API_URL")
                .unwrap_or_else(|_| "https://sandbox.feedly.com".into()),

            entries_per_refresh: std::env::var("ENTRIES_PER_REFRESH")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .context("Invalid ENTRIES_PER_REFRESH")?,
            bundle_id: std::env::var("BUNDLE_ID").unwrap_or_else(|_| "glassfeed".into()),
            cover_image_url: std::env::var("COVER_IMAGE_URL").unwrap_or_else(|_| {
                "http://glass-apps.org/wp-content/uploads/2013/03/feedly-logo1.png".into()
            }),
            image_fetch_timeout: Duration::from_secs(
                std::env::var("IMAGE_FETCH_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "20".into())
                    .parse()
                    .context("Invalid IMAGE_FETCH_TIMEOUT_SECS")?,
            ),
            broadcast_user_limit: std::env::var("BROADCAST_USER_LIMIT")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .context("Invalid BROADCAST_USER_LIMIT")?,
        })
    }

    /// Timeline OAuth redirect target.
    pub fn timeline_callback_url(&self) -> String {
        format!("{}/oauth2callback", self.base_url)
    }

    /// Feed OAuth redirect target. The index page finishes the exchange.
    pub fn feed_callback_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Resolve a site-relative URL (leading `/`) against `base_url`.
    pub fn full_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), path_or_url)
        } else {
            path_or_url.to_string()
        }
    }

    /// Settings consumed by the refresh cycle.
    pub fn sync_settings(&self) -> crate::sync::SyncSettings {
        crate::sync::SyncSettings {
            bundle_id: self.bundle_id.clone(),
            entries_per_refresh: self.entries_per_refresh,
            cover_image_url: self.cover_image_url.clone(),
            notify_callback_url: self.notify_callback_url.clone(),
            image_fetch_timeout: self.image_fetch_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 8080,
            base_url: "https://glass.example.com".into(),
            database_url: None,
            master_key: String::new(),
            hmac_secret: String::new(),
            timeline_client_id: "tid".into(),
            timeline_client_secret: "tsecret".into(),
            timeline_api_url: String::new(),
            timeline_upload_url: String::new(),
            timeline_auth_url: String::new(),
            timeline_token_url: String::new(),
            timeline_userinfo_url: String::new(),
            notify_callback_url: "https://glass.example.com/subscriptions".into(),
            contact_id: "glassfeed".into(),
            feed_client_id: "fid".into(),
            feed_client_secret: "fsecret".into(),
            feed_api_url: String::new(),
            entries_per_refresh: 3,
            bundle_id: "b1".into(),
            cover_image_url: "https://img.example.com/cover.png".into(),
            image_fetch_timeout: Duration::from_secs(20),
            broadcast_user_limit: 10,
        }
    }

    #[test]
    fn full_url_resolves_site_relative_paths() {
        let config = sample();
        assert_eq!(
            config.full_url("/static/cat.jpg"),
            "https://glass.example.com/static/cat.jpg"
        );
        assert_eq!(
            config.full_url("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn callback_urls_hang_off_base_url() {
        let config = sample();
        assert_eq!(
            config.timeline_callback_url(),
            "https://glass.example.com/oauth2callback"
        );
        assert_eq!(config.feed_callback_url(), "https://glass.example.com/");
    }
}
