//! Turns unread feed entries into timeline cards.

use tracing::{info, warn};

use super::batch::{run_batch, BatchOutcome};
use super::cards::entry_card;
use super::source_id::SourceId;
use super::SyncContext;
use crate::error::AppError;
use crate::feed::image::resolve_image;
use crate::timeline::media::fetch_attachment;
use crate::timeline::Card;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub fetched: usize,
    pub cards: BatchOutcome,
    pub marked_read: bool,
}

/// Fetch the unread entries of `feed_user_id`, insert one card each, then mark them read.
///
/// Marking read happens once every insert has settled and is not undone when
/// some inserts failed.
pub async fn import_entries(
    ctx: &SyncContext<'_>,
    feed_user_id: &str,
) -> Result<ImportReport, AppError> {
    let entries = ctx
        .feed
        .unread_entries(feed_user_id, ctx.settings.entries_per_refresh)
        .await?;

    let mut inserts = Vec::with_capacity(entries.len());
    let mut entry_ids = Vec::with_capacity(entries.len());
    for entry in &entries {
        let source_id = match SourceId::new(feed_user_id, &entry.id) {
            Ok(id) => id.encode(),
            Err(e) => {
                warn!(entry_id = %entry.id, "skipping entry: {e}");
                continue;
            }
        };
        let image = resolve_image(entry);
        let card = entry_card(&ctx.settings.bundle_id, &source_id, entry, image.as_deref());
        entry_ids.push(entry.id.clone());
        inserts.push((entry.id.clone(), insert_with_image(ctx, card, image)));
    }

    let (cards, _) = run_batch("insert entry card", inserts).await;

    // Skipped entries stay unread so they are not lost.
    let marked_read = match ctx.feed.mark_as_read(&entry_ids).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %ctx.user_id, "failed to mark {} entries read: {e}", entry_ids.len());
            false
        }
    };

    info!(
        user_id = %ctx.user_id,
        fetched = entries.len(),
        inserted = cards.success,
        failed = cards.failure,
        "imported feed entries"
    );

    Ok(ImportReport {
        fetched: entries.len(),
        cards,
        marked_read,
    })
}

/// Insert `card`, attaching `image` as media when it downloads in time.
pub(crate) async fn insert_with_image(
    ctx: &SyncContext<'_>,
    card: Card,
    image: Option<String>,
) -> Result<Card, AppError> {
    let Some(url) = image else {
        return ctx.timeline.insert_card(&card).await;
    };

    match fetch_attachment(ctx.http, &url, ctx.settings.image_fetch_timeout).await {
        Ok(media) => ctx.timeline.insert_card_with_media(&card, &media).await,
        Err(e) => {
            warn!(image = %url, "image download failed, inserting without media: {e}");
            ctx.timeline.insert_card(&card).await
        }
    }
}
