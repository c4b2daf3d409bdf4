use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Joins the two halves of a [`SourceId`]. Must not occur in either half.
pub const SEPARATOR: &str = "|~|";

/// Ties a timeline card back to the feed entry it was built from.
///
/// Stored as the card's `sourceItemId` in the form `<feed user id>|~|<entry id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceId {
    pub feed_user_id: String,
    pub entry_id: String,
}

impl SourceId {
    /// Fails when either half contains [`SEPARATOR`]; such a pair could not be decoded.
    pub fn new(feed_user_id: &str, entry_id: &str) -> Result<Self, AppError> {
        for part in [feed_user_id, entry_id] {
            if part.contains(SEPARATOR) {
                return Err(AppError::InvalidSourceId(format!(
                    "{part:?} contains the separator {SEPARATOR:?}"
                )));
            }
        }
        Ok(Self {
            feed_user_id: feed_user_id.to_string(),
            entry_id: entry_id.to_string(),
        })
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.feed_user_id, SEPARATOR, self.entry_id)
    }
}

impl FromStr for SourceId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (feed_user_id, entry_id) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| AppError::InvalidSourceId(format!("{s:?} has no separator")))?;
        if feed_user_id.is_empty() || entry_id.is_empty() {
            return Err(AppError::InvalidSourceId(format!("{s:?} has an empty half")));
        }
        Ok(Self {
            feed_user_id: feed_user_id.to_string(),
            entry_id: entry_id.to_string(),
        })
    }
}
