#![allow(dead_code)]

use std::time::Duration;

use glassfeed::feed::FeedClient;
use glassfeed::store::MemoryStore;
use glassfeed::sync::{SyncContext, SyncSettings};
use glassfeed::timeline::TimelineClient;
use wiremock::MockServer;

pub const USER_ID: &str = "108234";
pub const FEED_USER_ID: &str = "feed-user-1";

/// Clients and settings pointed at one mock server standing in for both APIs.
pub struct Harness {
    pub server: MockServer,
    pub http: reqwest::Client,
    pub timeline: TimelineClient,
    pub feed: FeedClient,
    pub store: MemoryStore,
    pub settings: SyncSettings,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let http = reqwest::Client::new();
        let uri = server.uri();

        Self {
            timeline: TimelineClient::new(
                http.clone(),
                &uri,
                &format!("{uri}/upload"),
                "timeline-token",
            ),
            feed: FeedClient::new(http.clone(), &uri, "feed-token"),
            settings: SyncSettings {
                bundle_id: "glassfeed".into(),
                entries_per_refresh: 5,
                cover_image_url: format!("{uri}/cover.png"),
                notify_callback_url: "https://glass.example.com/subscriptions".into(),
                image_fetch_timeout: Duration::from_secs(5),
            },
            store: MemoryStore::new(),
            http,
            server,
        }
    }

    pub fn ctx(&self) -> SyncContext<'_> {
        SyncContext {
            user_id: USER_ID,
            timeline: &self.timeline,
            feed: &self.feed,
            store: &self.store,
            http: &self.http,
            settings: &self.settings,
        }
    }
}
