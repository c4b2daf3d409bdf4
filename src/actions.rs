//! Card actions posted back by the timeline service.

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::sync::cards::{REFRESH_ACTION_ID, SAVE_ACTION_ID};
use crate::sync::{refresh_cycle, CycleReport, SourceId, SyncContext};

/// Notification body, `{userToken, itemId, userActions: [{type, payload}]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNotification {
    #[serde(default)]
    pub item_id: Option<String>,
    pub user_token: String,
    #[serde(default)]
    pub user_actions: Vec<UserAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserAction {
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Save,
    Refresh,
    Unknown,
}

impl CardAction {
    pub fn from_payload(payload: Option<&str>) -> Self {
        match payload {
            Some(SAVE_ACTION_ID) => CardAction::Save,
            Some(REFRESH_ACTION_ID) => CardAction::Refresh,
            _ => CardAction::Unknown,
        }
    }
}

impl ActionNotification {
    pub fn actions(&self) -> impl Iterator<Item = CardAction> + '_ {
        self.user_actions
            .iter()
            .map(|a| CardAction::from_payload(a.payload.as_deref()))
    }
}

#[derive(Debug)]
pub enum ActionOutcome {
    Saved(SourceId),
    Refreshed(Box<CycleReport>),
    Ignored(&'static str),
}

/// Carry out one action against the card `item_id`.
pub async fn handle_action(
    ctx: &SyncContext<'_>,
    item_id: &str,
    action: CardAction,
) -> Result<ActionOutcome, AppError> {
    match action {
        CardAction::Save => save(ctx, item_id).await,
        CardAction::Refresh => refresh(ctx, item_id).await,
        CardAction::Unknown => Ok(ActionOutcome::Ignored("unrecognised action")),
    }
}

async fn save(ctx: &SyncContext<'_>, item_id: &str) -> Result<ActionOutcome, AppError> {
    let card = ctx.timeline.get_card(item_id).await?;
    let Some(raw) = card.source_item_id.as_deref() else {
        return Ok(ActionOutcome::Ignored("card has no source id"));
    };

    let source: SourceId = match raw.parse() {
        Ok(source) => source,
        Err(e) => {
            warn!(user_id = %ctx.user_id, item_id, "save ignored: {e}");
            return Ok(ActionOutcome::Ignored("source id does not decode"));
        }
    };

    ctx.feed
        .tag_saved(&source.feed_user_id, &source.entry_id)
        .await?;
    info!(user_id = %ctx.user_id, entry_id = %source.entry_id, "saved entry for later");
    Ok(ActionOutcome::Saved(source))
}

async fn refresh(ctx: &SyncContext<'_>, item_id: &str) -> Result<ActionOutcome, AppError> {
    let card = ctx.timeline.get_card(item_id).await?;
    let Some(marker) = card.source_item_id.as_deref() else {
        return Ok(ActionOutcome::Ignored("card has no marker"));
    };

    if !ctx.store.take_refresh_marker(marker).await? {
        info!(user_id = %ctx.user_id, marker, "stale refresh marker, ignoring");
        return Ok(ActionOutcome::Ignored("refresh marker already consumed"));
    }

    let report = refresh_cycle(ctx).await?;
    Ok(ActionOutcome::Refreshed(Box::new(report)))
}
