use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{urlencoding, OAuthProvider, TokenSet};
use crate::config::Config;
use crate::error::AppError;

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/glass.timeline",
    "https://www.googleapis.com/auth/glass.location",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// OAuth 2.0 provider for the timeline service.
///
/// Refresh tokens are only issued with `access_type=offline` and `prompt=consent`.
pub struct TimelineProvider {
    client_id: String,
    client_secret: String,
    auth_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TimelineTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
}

impl TimelineProvider {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            client_id: config.timeline_client_id.clone(),
            client_secret: config.timeline_client_secret.clone(),
            auth_endpoint: config.timeline_auth_url.clone(),
            token_endpoint: config.timeline_token_url.clone(),
            userinfo_endpoint: config.timeline_userinfo_url.clone(),
            http,
        }
    }

    /// Look up the account id behind an access token; it becomes the local user id.
    pub async fn user_id(&self, access_token: &str) -> Result<String, AppError> {
        let resp = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::FlowError(format!("Userinfo request failed: {e}")))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::FlowError(format!("Userinfo lookup failed: {body}")));
        }

        let info: UserInfo = resp
            .json()
            .await
            .map_err(|e| AppError::FlowError(format!("Failed to parse userinfo: {e}")))?;
        Ok(info.id)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TimelineTokenResponse, String> {
        let resp = self
            .http
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("token endpoint rejected request: {body}"));
        }

        resp.json()
            .await
            .map_err(|e| format!("failed to parse token response: {e}"))
    }
}

#[async_trait]
impl OAuthProvider for TimelineProvider {
    fn id(&self) -> &str {
        "timeline"
    }

    fn auth_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{endpoint}?client_id={client_id}\
             &redirect_uri={redirect_uri}\
             &response_type=code\
             &scope={scope}\
             &state={state}\
             &access_type=offline\
             &prompt=consent",
            endpoint = self.auth_endpoint,
            client_id = urlencoding(&self.client_id),
            redirect_uri = urlencoding(redirect_uri),
            scope = urlencoding(&SCOPES.join(" ")),
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
            // Not always rotated on refresh
            refresh_token: resp.refresh_token,
            expires_in: resp.expires_in,
        })
    }
}
