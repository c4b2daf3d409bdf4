use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{urlencoding, OAuthProvider, TokenSet};
use crate::config::Config;
use crate::error::AppError;

const SCOPE: &str = "https://cloud.feedly.com/subscriptions";

/// OAuth provider for the feed service (`/v3/auth/*`).
///
/// Access tokens live about a week; refresh does not rotate the refresh token.
pub struct FeedProvider {
    client_id: String,
    client_secret: String,
    api_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FeedTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl FeedProvider {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            client_id: config.feed_client_id.clone(),
            client_secret: config.feed_client_secret.clone(),
            api_url: config.feed_api_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<FeedTokenResponse, String> {
        let resp = self
            .http
            .post(format!("{}/v3/auth/token", self.api_url))
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("feed token endpoint rejected request: {body}"));
        }

        resp.json()
            .await
            .map_err(|e| format!("failed to parse feed token response: {e}"))
    }
}

#[async_trait]
impl OAuthProvider for FeedProvider {
    fn id(&self) -> &str {
        "feed"
    }

    fn auth_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{api}/v3/auth/auth?response_type=code\
             &client_id={client_id}\
             &redirect_uri={redirect_uri}\
             &scope={scope}\
             &state={state}",
            api = self.api_url,
            client_id = urlencoding(&self.client_id),
            redirect_uri = urlencoding(redirect_uri),
            scope = urlencoding(SCOPE),
            state = urlencoding(state),
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, AppError> {
        let resp = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(AppError::FlowError)?;

        Ok(TokenSet {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        let resp = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(AppError::RefreshFailed)?;

        Ok(TokenSet {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
        })
    }
}
