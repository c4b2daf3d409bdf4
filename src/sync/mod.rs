//! The refresh cycle: reconcile sentinel cards, import unread entries, re-arm the refresh card.

pub mod batch;
pub mod cards;
pub mod importer;
pub mod reconcile;
pub mod source_id;

pub use importer::ImportReport;
pub use reconcile::Sentinels;
pub use source_id::SourceId;

use std::time::Duration;
use tracing::{info, warn};

use crate::error::AppError;
use crate::feed::FeedClient;
use crate::store::StateStore;
use crate::timeline::{Card, Subscription, TimelineClient};

/// Knobs for the refresh cycle, taken from [`Config`](crate::config::Config).
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub bundle_id: String,
    pub entries_per_refresh: u32,
    pub cover_image_url: String,
    pub notify_callback_url: String,
    pub image_fetch_timeout: Duration,
}

/// Everything one user's refresh cycle touches.
pub struct SyncContext<'a> {
    pub user_id: &'a str,
    pub timeline: &'a TimelineClient,
    pub feed: &'a FeedClient,
    pub store: &'a dyn StateStore,
    pub http: &'a reqwest::Client,
    pub settings: &'a SyncSettings,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub subscribed: bool,
    pub sentinels: Sentinels,
    pub stale_deleted: usize,
    pub import: ImportReport,
    pub marker_id: String,
}

/// Run one full refresh for `ctx.user_id`.
pub async fn refresh_cycle(ctx: &SyncContext<'_>) -> Result<CycleReport, AppError> {
    let subscribed = ensure_subscription(ctx).await?;

    let profile = ctx.feed.profile().await?;
    let categories = match ctx.feed.categories().await {
        Ok(categories) => categories,
        Err(e) => {
            warn!(user_id = %ctx.user_id, "could not load categories for cover: {e}");
            Vec::new()
        }
    };

    let current = ctx.timeline.list_cards(None).await?;
    let (sentinels, deleted) = reconcile::reconcile(ctx.timeline, current).await;

    let cover = cards::cover_card(
        &ctx.settings.bundle_id,
        &categories,
        &ctx.settings.cover_image_url,
    );
    match &sentinels.cover_id {
        Some(id) => {
            ctx.timeline.update_card(id, &cover).await?;
        }
        None => {
            importer::insert_with_image(ctx, cover, Some(ctx.settings.cover_image_url.clone()))
                .await?;
        }
    }

    let import = importer::import_entries(ctx, &profile.id).await?;

    // The old marker stays live until the card carrying the new one is in place.
    let marker_id = uuid::Uuid::new_v4().to_string();
    let refresh = cards::refresh_card(&ctx.settings.bundle_id, &marker_id);
    upsert(ctx.timeline, sentinels.refresh_id.as_deref(), &refresh).await?;
    ctx.store.put_refresh_marker(ctx.user_id, &marker_id).await?;

    info!(
        user_id = %ctx.user_id,
        cover_reused = sentinels.cover_id.is_some(),
        refresh_reused = sentinels.refresh_id.is_some(),
        "refresh cycle complete"
    );

    Ok(CycleReport {
        subscribed,
        sentinels,
        stale_deleted: deleted.success,
        import,
        marker_id,
    })
}

async fn upsert(timeline: &TimelineClient, id: Option<&str>, card: &Card) -> Result<Card, AppError> {
    match id {
        Some(id) => timeline.update_card(id, card).await,
        None => timeline.insert_card(card).await,
    }
}

/// Make sure the timeline posts action notifications back to us.
///
/// Returns `true` when a subscription was created.
pub async fn ensure_subscription(ctx: &SyncContext<'_>) -> Result<bool, AppError> {
    let callback_url = &ctx.settings.notify_callback_url;
    let existing = ctx.timeline.list_subscriptions().await?;
    let present = existing.iter().any(|s| {
        s.collection == "timeline" && (&s.callback_url == callback_url || s.user_token == ctx.user_id)
    });
    if present {
        return Ok(false);
    }

    ctx.timeline
        .insert_subscription(&Subscription {
            id: None,
            collection: "timeline".into(),
            user_token: ctx.user_id.to_string(),
            callback_url: callback_url.clone(),
        })
        .await?;
    info!(user_id = %ctx.user_id, "subscribed to timeline notifications");
    Ok(true)
}
