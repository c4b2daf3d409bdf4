//! Resolves a local user to ready-to-use API clients, refreshing expired tokens.

use tracing::{info, warn};

use crate::error::AppError;
use crate::feed::FeedClient;
use crate::providers::{OAuthProvider, TokenSet};
use crate::store::{Credential, Service, StateStore};
use crate::timeline::TimelineClient;
use crate::AppState;

/// Store tokens from a code exchange or refresh under `user_id`.
pub async fn save_tokens(
    store: &dyn StateStore,
    service: Service,
    user_id: &str,
    tokens: &TokenSet,
) -> Result<Credential, AppError> {
    let cred = Credential {
        user_id: user_id.to_string(),
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
        expires_at: tokens.expires_at(),
    };
    store.put_credential(service, &cred).await?;
    Ok(cred)
}

/// Load a credential, refreshing it through `provider` when it has expired.
///
/// `None` when the user never connected, or the token expired without a way to renew it.
pub async fn fresh_credential(
    store: &dyn StateStore,
    provider: &dyn OAuthProvider,
    service: Service,
    user_id: &str,
) -> Result<Option<Credential>, AppError> {
    let Some(cred) = store.get_credential(service, user_id).await? else {
        return Ok(None);
    };

    if !cred.is_expired() {
        return Ok(Some(cred));
    }

    let Some(refresh_token) = cred.refresh_token.as_deref() else {
        warn!(user_id, provider = provider.id(), "token expired and no refresh token available");
        return Ok(None);
    };

    let tokens = provider.refresh_token(refresh_token).await?;
    let refreshed = save_tokens(store, service, user_id, &tokens).await?;
    info!(user_id, provider = provider.id(), "refreshed access token");

    Ok(Some(Credential {
        refresh_token: refreshed.refresh_token.or_else(|| cred.refresh_token.clone()),
        ..refreshed
    }))
}

pub async fn timeline_client(
    state: &AppState,
    user_id: &str,
) -> Result<Option<TimelineClient>, AppError> {
    let cred = fresh_credential(
        state.store.as_ref(),
        &state.timeline_auth,
        Service::Timeline,
        user_id,
    )
    .await?;

    Ok(cred.map(|c| {
        TimelineClient::new(
            state.http.clone(),
            &state.config.timeline_api_url,
            &state.config.timeline_upload_url,
            c.access_token,
        )
    }))
}

pub async fn feed_client(state: &AppState, user_id: &str) -> Result<Option<FeedClient>, AppError> {
    let cred = fresh_credential(
        state.store.as_ref(),
        &state.feed_auth,
        Service::Feed,
        user_id,
    )
    .await?;

    Ok(cred.map(|c| FeedClient::new(state.http.clone(), &state.config.feed_api_url, c.access_token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl OAuthProvider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }

        fn auth_url(&self, _state: &str, _redirect_uri: &str) -> String {
            String::new()
        }

        async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenSet, AppError> {
            Err(AppError::FlowError("unused".into()))
        }

        async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(TokenSet {
                access_token: format!("fresh-from-{refresh_token}"),
                refresh_token: None,
                expires_in: Some(3600),
            })
        }
    }

    fn stub() -> StubProvider {
        StubProvider {
            refreshes: AtomicUsize::new(0),
        }
    }

    async fn seed(store: &MemoryStore, expires_in: i64, refresh: Option<&str>) {
        store
            .put_credential(
                Service::Feed,
                &Credential {
                    user_id: "u1".into(),
                    access_token: "old".into(),
                    refresh_token: refresh.map(Into::into),
                    expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn valid_token_is_returned_untouched() {
        let store = MemoryStore::new();
        let provider = stub();
        seed(&store, 600, Some("r1")).await;

        let cred = fresh_credential(&store, &provider, Service::Feed, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_token, "old");
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_stored() {
        let store = MemoryStore::new();
        let provider = stub();
        seed(&store, -60, Some("r1")).await;

        let cred = fresh_credential(&store, &provider, Service::Feed, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_token, "fresh-from-r1");
        assert_eq!(cred.refresh_token.as_deref(), Some("r1"));

        let stored = store.get_credential(Service::Feed, "u1").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh-from-r1");
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_counts_as_missing() {
        let store = MemoryStore::new();
        let provider = stub();
        seed(&store, -60, None).await;

        assert!(fresh_credential(&store, &provider, Service::Feed, "u1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_user_has_no_credential() {
        let store = MemoryStore::new();
        assert!(fresh_credential(&store, &stub(), Service::Feed, "nobody")
            .await
            .unwrap()
            .is_none());
    }
}
