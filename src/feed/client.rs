//! Client for the feed service's `/v3` REST API.

use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Category, Entry, MarkersRequest, Profile, StreamContents, TagRequest};
use crate::error::{check_status, transport, AppError};

const SERVICE: &str = "feed";

/// Feed API handle bound to one user's access token.
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    api_url: String,
    access_token: String,
}

/// Stream id holding every subscription of a feed user.
pub fn all_stream_id(feed_user_id: &str) -> String {
    format!("user/{feed_user_id}/category/global.all")
}

/// Tag id of a feed user's saved-for-later list.
pub fn saved_tag_id(feed_user_id: &str) -> String {
    format!("user/{feed_user_id}/tag/global.saved")
}

impl FeedClient {
    pub fn new(http: reqwest::Client, api_url: &str, access_token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub async fn profile(&self) -> Result<Profile, AppError> {
        self.get_json("/v3/profile", &[]).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, AppError> {
        self.get_json("/v3/categories", &[]).await
    }

    /// Unread entries of the user's global stream, in the service's default ranking.
    pub async fn unread_entries(
        &self,
        feed_user_id: &str,
        count: u32,
    ) -> Result<Vec<Entry>, AppError> {
        let stream_id = all_stream_id(feed_user_id);
        let count = count.to_string();
        let contents: StreamContents = self
            .get_json(
                "/v3/streams/contents",
                &[
                    ("streamId", stream_id.as_str()),
                    ("count", count.as_str()),
                    ("unreadOnly", "true"),
                ],
            )
            .await?;
        Ok(contents.items)
    }

    pub async fn mark_as_read(&self, entry_ids: &[String]) -> Result<(), AppError> {
        if entry_ids.is_empty() {
            return Ok(());
        }
        debug!(count = entry_ids.len(), "marking entries read");
        let resp = self
            .http
            .post(format!("{}/v3/markers", self.api_url))
            .header(AUTHORIZATION, self.auth_header())
            .json(&MarkersRequest {
                action: "markAsRead",
                kind: "entries",
                entry_ids,
            })
            .send()
            .await
            .map_err(transport(SERVICE))?;
        check_status(SERVICE, resp).await?;
        Ok(())
    }

    /// Add an entry to the feed user's saved-for-later tag.
    pub async fn tag_saved(&self, feed_user_id: &str, entry_id: &str) -> Result<(), AppError> {
        let tag: String =
            url::form_urlencoded::byte_serialize(saved_tag_id(feed_user_id).as_bytes()).collect();
        let resp = self
            .http
            .put(format!("{}/v3/tags/{}", self.api_url, tag))
            .header(AUTHORIZATION, self.auth_header())
            .json(&TagRequest { entry_id })
            .send()
            .await
            .map_err(transport(SERVICE))?;
        check_status(SERVICE, resp).await?;
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("OAuth {}", self.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let resp = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header(AUTHORIZATION, self.auth_header())
            .query(query)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let resp = check_status(SERVICE, resp).await?;
        resp.json().await.map_err(transport(SERVICE))
    }
}
