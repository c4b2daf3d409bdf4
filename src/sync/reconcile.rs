//! Sorts a user's timeline into the two sentinel cards and everything else.

use tracing::{debug, info};

use super::batch::{run_batch, BatchOutcome};
use super::cards::{role_of, CardRole};
use crate::timeline::{Card, TimelineClient};

/// Result of classifying the current timeline.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub cover: Option<Card>,
    pub refresh: Option<Card>,
    /// Unmarked cards plus any duplicate sentinels; all get deleted.
    pub stale: Vec<Card>,
}

/// Ids of the sentinel cards that survived reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentinels {
    pub cover_id: Option<String>,
    pub refresh_id: Option<String>,
}

pub fn classify(cards: Vec<Card>) -> Reconciliation {
    let mut out = Reconciliation::default();
    for card in cards {
        let slot = match role_of(&card) {
            CardRole::Cover => &mut out.cover,
            CardRole::Refresh => &mut out.refresh,
            CardRole::Other => {
                out.stale.push(card);
                continue;
            }
        };
        if slot.is_none() {
            *slot = Some(card);
        } else {
            out.stale.push(card);
        }
    }
    out
}

/// Delete stale cards in one best-effort batch and report the sentinels found.
pub async fn reconcile(timeline: &TimelineClient, cards: Vec<Card>) -> (Sentinels, BatchOutcome) {
    let rec = classify(cards);

    let deletes: Vec<_> = rec
        .stale
        .iter()
        .filter_map(|card| card.id.clone())
        .map(|id| (id.clone(), async move { timeline.delete_card(&id).await }))
        .collect();

    debug!(stale = deletes.len(), "deleting stale cards");
    let (outcome, _) = run_batch("delete card", deletes).await;
    if outcome.failure > 0 {
        info!(
            deleted = outcome.success,
            failed = outcome.failure,
            "stale card cleanup partially failed"
        );
    }

    let sentinels = Sentinels {
        cover_id: rec.cover.and_then(|c| c.id),
        refresh_id: rec.refresh.and_then(|c| c.id),
    };
    (sentinels, outcome)
}
