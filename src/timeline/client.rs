//! Client for the timeline service's REST collections (timeline, subscriptions, contacts).

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::types::{Attachment, Card, Contact, ListResponse, Subscription};
use crate::error::{check_status, transport, AppError};

const SERVICE: &str = "timeline";

/// Timeline API handle bound to one user's access token.
#[derive(Clone)]
pub struct TimelineClient {
    http: reqwest::Client,
    api_url: String,
    upload_url: String,
    access_token: String,
}

impl TimelineClient {
    pub fn new(
        http: reqwest::Client,
        api_url: &str,
        upload_url: &str,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    // ── Timeline ────────────────────────────────────────────────────────

    /// List cards, newest first.
    ///
    /// With `max_results` only the first page is fetched; without it every
    /// page is followed until the service stops returning a page token.
    pub async fn list_cards(&self, max_results: Option<u32>) -> Result<Vec<Card>, AppError> {
        let mut cards = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .http
                .get(format!("{}/timeline", self.api_url))
                .bearer_auth(&self.access_token);
            if let Some(max) = max_results {
                req = req.query(&[("maxResults", max)]);
            }
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let page: ListResponse<Card> = self.send_json(req).await?;
            cards.extend(page.items);

            match page.next_page_token {
                Some(token) if max_results.is_none() && !token.is_empty() => {
                    debug!(fetched = cards.len(), "following timeline page token");
                    page_token = Some(token);
                }
                _ => return Ok(cards),
            }
        }
    }

    pub async fn get_card(&self, id: &str) -> Result<Card, AppError> {
        let req = self
            .http
            .get(self.item_url("timeline", id)?)
            .bearer_auth(&self.access_token);
        self.send_json(req).await
    }

    pub async fn insert_card(&self, card: &Card) -> Result<Card, AppError> {
        self.post_json(&format!("{}/timeline", self.api_url), card)
            .await
    }

    /// Insert a card with an attached image using a `multipart/related` upload.
    pub async fn insert_card_with_media(
        &self,
        card: &Card,
        media: &Attachment,
    ) -> Result<Card, AppError> {
        let boundary = format!("glassfeed-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, card, media)?;

        debug!(bytes = media.bytes.len(), content_type = %media.content_type, "uploading card media");
        let req = self
            .http
            .post(format!("{}/timeline", self.upload_url))
            .query(&[("uploadType", "multipart")])
            .bearer_auth(&self.access_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        self.send_json(req).await
    }

    pub async fn update_card(&self, id: &str, card: &Card) -> Result<Card, AppError> {
        let req = self
            .http
            .put(self.item_url("timeline", id)?)
            .bearer_auth(&self.access_token)
            .json(card);
        self.send_json(req).await
    }

    pub async fn delete_card(&self, id: &str) -> Result<(), AppError> {
        self.delete(&self.item_url("timeline", id)?)
            .await
    }

    // ── Subscriptions ───────────────────────────────────────────────────

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, AppError> {
        let req = self
            .http
            .get(format!("{}/subscriptions", self.api_url))
            .bearer_auth(&self.access_token);
        let list: ListResponse<Subscription> = self.send_json(req).await?;
        Ok(list.items)
    }

    pub async fn insert_subscription(&self, sub: &Subscription) -> Result<Subscription, AppError> {
        self.post_json(&format!("{}/subscriptions", self.api_url), sub)
            .await
    }

    pub async fn delete_subscription(&self, id: &str) -> Result<(), AppError> {
        self.delete(&self.item_url("subscriptions", id)?)
            .await
    }

    // ── Contacts ────────────────────────────────────────────────────────

    pub async fn get_contact(&self, id: &str) -> Result<Contact, AppError> {
        let req = self
            .http
            .get(self.item_url("contacts", id)?)
            .bearer_auth(&self.access_token);
        self.send_json(req).await
    }

    pub async fn insert_contact(&self, contact: &Contact) -> Result<Contact, AppError> {
        self.post_json(&format!("{}/contacts", self.api_url), contact)
            .await
    }

    pub async fn delete_contact(&self, id: &str) -> Result<(), AppError> {
        self.delete(&self.item_url("contacts", id)?)
            .await
    }

    // ── Plumbing ────────────────────────────────────────────────────────

    /// `{api_url}/{collection}/{id}` with `id` escaped as a single path segment.
    fn item_url(&self, collection: &str, id: &str) -> Result<String, AppError> {
        item_url(&self.api_url, collection, id)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let req = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body);
        self.send_json(req).await
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport(SERVICE))?;
        check_status(SERVICE, resp).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let resp = req.send().await.map_err(transport(SERVICE))?;
        let resp = check_status(SERVICE, resp).await?;
        resp.json().await.map_err(transport(SERVICE))
    }
}

fn item_url(base: &str, collection: &str, id: &str) -> Result<String, AppError> {
    let mut url = url::Url::parse(base)
        .map_err(|e| AppError::Internal(format!("invalid {SERVICE} API url {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Internal(format!("{SERVICE} API url {base} cannot take a path")))?
        .pop_if_empty()
        .push(collection)
        .push(id);
    Ok(url.into())
}

/// Metadata part as JSON, media part as raw bytes.
fn multipart_related(boundary: &str, card: &Card, media: &Attachment) -> Result<Vec<u8>, AppError> {
    let metadata = serde_json::to_vec(card)
        .map_err(|e| AppError::Internal(format!("failed to serialize card: {e}")))?;

    let mut body = Vec::with_capacity(metadata.len() + media.bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(&metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media.content_type).as_bytes());
    body.extend_from_slice(&media.bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}
