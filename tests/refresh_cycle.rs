mod common;

use common::{Harness, FEED_USER_ID, USER_ID};
use glassfeed::store::StateStore;
use glassfeed::sync::refresh_cycle;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_feed(h: &Harness, entries: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .and(header("authorization", "OAuth feed-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": FEED_USER_ID })))
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "c1", "label": "Tech" },
            { "id": "c2", "label": "News" }
        ])))
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/streams/contents"))
        .and(query_param(
            "streamId",
            format!("user/{FEED_USER_ID}/category/global.all"),
        ))
        .and(query_param("unreadOnly", "true"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": entries })))
        .mount(&h.server)
        .await;
}

#[tokio::test]
async fn cycle_prunes_unmarked_cards_and_reuses_sentinels() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "timeline",
                "collection": "timeline",
                "userToken": USER_ID,
                "callbackUrl": "https://glass.example.com/subscriptions"
            }]
        })))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "collection": "timeline" })))
        .expect(0)
        .mount(&h.server)
        .await;

    mount_feed(
        &h,
        json!([
            {
                "id": "e1",
                "title": "First post",
                "alternate": [{ "href": "https://blog.example.com/1", "type": "text/html" }]
            },
            { "id": "e2", "title": "Second post" }
        ]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "cover-1", "title": "glassfeed:cover", "isBundleCover": true },
                { "id": "old-entry", "text": "yesterday's news" },
                { "id": "refresh-1", "title": "glassfeed:refresh", "sourceItemId": "m-old" },
                { "id": "cover-2", "title": "glassfeed:cover" }
            ]
        })))
        .mount(&h.server)
        .await;

    for stale in ["old-entry", "cover-2"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/timeline/{stale}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&h.server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/timeline/cover-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&h.server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/timeline/cover-1"))
        .and(body_partial_json(json!({ "title": "glassfeed:cover", "isBundleCover": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cover-1" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/timeline/refresh-1"))
        .and(body_partial_json(json!({ "title": "glassfeed:refresh", "isPinned": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "refresh-1" })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/timeline"))
        .and(header("authorization", "Bearer timeline-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-card" })))
        .expect(2)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .and(body_partial_json(json!({
            "action": "markAsRead",
            "type": "entries",
            "entryIds": ["e1", "e2"]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();

    assert!(!report.subscribed);
    assert_eq!(report.stale_deleted, 2);
    assert_eq!(report.sentinels.cover_id.as_deref(), Some("cover-1"));
    assert_eq!(report.sentinels.refresh_id.as_deref(), Some("refresh-1"));
    assert_eq!(report.import.fetched, 2);
    assert_eq!(report.import.cards.success, 2);
    assert!(report.import.marked_read);

    assert!(h.store.take_refresh_marker(&report.marker_id).await.unwrap());
    assert!(!h.store.take_refresh_marker(&report.marker_id).await.unwrap());
}

#[tokio::test]
async fn first_cycle_subscribes_and_creates_sentinels() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(body_partial_json(json!({
            "collection": "timeline",
            "userToken": USER_ID,
            "callbackUrl": "https://glass.example.com/subscriptions"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "collection": "timeline" })))
        .expect(1)
        .mount(&h.server)
        .await;

    mount_feed(&h, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cover.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cover-new" })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/timeline"))
        .and(body_partial_json(json!({ "title": "glassfeed:refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "refresh-new" })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();

    assert!(report.subscribed);
    assert_eq!(report.stale_deleted, 0);
    assert_eq!(report.sentinels.cover_id, None);
    assert_eq!(report.import.fetched, 0);
    assert!(h.store.take_refresh_marker(&report.marker_id).await.unwrap());
}

#[tokio::test]
async fn failed_profile_aborts_before_touching_timeline() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "collection": "timeline", "userToken": USER_ID }]
        })))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = refresh_cycle(&h.ctx()).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

// ── Steady-state timeline: subscription and both sentinels already exist ──

async fn mount_subscribed(h: &Harness) {
    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "collection": "timeline", "userToken": USER_ID }]
        })))
        .mount(&h.server)
        .await;
}

async fn mount_sentinel_updates(h: &Harness) {
    for id in ["cover-1", "refresh-1"] {
        Mock::given(method("PUT"))
            .and(path(format!("/timeline/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
            .expect(1)
            .mount(&h.server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/upload/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "dup" })))
        .expect(0)
        .mount(&h.server)
        .await;
}

async fn mount_timeline(h: &Harness, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(&h.server)
        .await;
}

fn sentinels() -> Vec<serde_json::Value> {
    vec![
        json!({ "id": "cover-1", "title": "glassfeed:cover" }),
        json!({ "id": "refresh-1", "title": "glassfeed:refresh" }),
    ]
}

#[tokio::test]
async fn sentinels_on_a_later_page_are_found() {
    let h = Harness::start().await;
    mount_subscribed(&h).await;
    mount_feed(&h, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/timeline"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": sentinels() })))
        .with_priority(1)
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "old" }],
            "nextPageToken": "p2"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/timeline/old"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;
    mount_sentinel_updates(&h).await;
    Mock::given(method("POST"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "dup" })))
        .expect(0)
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();

    assert_eq!(report.sentinels.cover_id.as_deref(), Some("cover-1"));
    assert_eq!(report.sentinels.refresh_id.as_deref(), Some("refresh-1"));
    assert_eq!(report.stale_deleted, 1);
}

#[tokio::test]
async fn failed_mark_read_keeps_inserted_cards() {
    let h = Harness::start().await;
    mount_subscribed(&h).await;
    mount_feed(&h, json!([{ "id": "e1", "title": "Only post" }])).await;
    mount_timeline(&h, json!(sentinels())).await;
    mount_sentinel_updates(&h).await;

    Mock::given(method("POST"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "card-e1" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/timeline/card-e1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("markers unavailable"))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();

    assert_eq!(report.import.cards.success, 1);
    assert!(!report.import.marked_read);
    assert!(h.store.take_refresh_marker(&report.marker_id).await.unwrap());
}

#[tokio::test]
async fn broken_or_slow_images_fall_back_to_plain_cards() {
    let mut h = Harness::start().await;
    h.settings.image_fetch_timeout = std::time::Duration::from_millis(200);
    let uri = h.server.uri();

    mount_subscribed(&h).await;
    mount_feed(
        &h,
        json!([
            { "id": "e1", "title": "Missing image", "thumbnail": [{ "url": format!("{uri}/missing.png") }] },
            { "id": "e2", "title": "Slow image", "visual": { "url": format!("{uri}/slow.jpg") } }
        ]),
    )
    .await;
    mount_timeline(&h, json!(sentinels())).await;
    mount_sentinel_updates(&h).await;

    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8])
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/timeline"))
        .and(body_partial_json(json!({ "bundleId": "glassfeed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "card" })))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();

    assert_eq!(report.import.cards.success, 2);
    assert_eq!(report.import.cards.failure, 0);
}

#[tokio::test]
async fn failed_stale_delete_does_not_abort_reconcile() {
    let h = Harness::start().await;
    mount_subscribed(&h).await;
    mount_feed(&h, json!([])).await;

    let mut items = sentinels();
    items.push(json!({ "id": "old-a" }));
    items.push(json!({ "id": "old-b" }));
    mount_timeline(&h, json!(items)).await;
    mount_sentinel_updates(&h).await;

    Mock::given(method("DELETE"))
        .and(path("/timeline/old-a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/timeline/old-b"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();

    assert_eq!(report.stale_deleted, 1);
    assert_eq!(report.sentinels.cover_id.as_deref(), Some("cover-1"));
}

#[tokio::test]
async fn entry_with_separator_in_id_stays_unread() {
    let h = Harness::start().await;
    mount_subscribed(&h).await;
    mount_feed(
        &h,
        json!([
            { "id": "good", "title": "Fine" },
            { "id": "bad|~|id", "title": "Unencodable" }
        ]),
    )
    .await;
    mount_timeline(&h, json!(sentinels())).await;
    mount_sentinel_updates(&h).await;

    Mock::given(method("POST"))
        .and(path("/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "card" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .and(body_partial_json(json!({ "entryIds": ["good"] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let report = refresh_cycle(&h.ctx()).await.unwrap();
    assert_eq!(report.import.fetched, 2);
    assert!(report.import.marked_read);
}

#[tokio::test]
async fn failed_refresh_card_update_keeps_previous_marker() {
    let h = Harness::start().await;
    h.store.put_refresh_marker(USER_ID, "marker-old").await.unwrap();
    mount_subscribed(&h).await;
    mount_feed(&h, json!([])).await;
    mount_timeline(&h, json!(sentinels())).await;

    Mock::given(method("PUT"))
        .and(path("/timeline/cover-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cover-1" })))
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/timeline/refresh-1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    assert!(refresh_cycle(&h.ctx()).await.is_err());
    assert!(h.store.take_refresh_marker("marker-old").await.unwrap());
}
