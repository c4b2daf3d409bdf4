use moka::future::Cache;
use std::time::Duration;

/// One-shot status messages shown on the next index page load.
#[derive(Clone)]
pub struct FlashMessages {
    cache: Cache<String, String>,
}

impl FlashMessages {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn set(&self, user_id: &str, message: impl Into<String>) {
        self.cache.insert(user_id.to_string(), message.into()).await;
    }

    /// Return and forget the pending message, if it has not expired.
    pub async fn take(&self, user_id: &str) -> Option<String> {
        // `remove` hands back entries past their TTL; `get` does not.
        let message = self.cache.get(user_id).await;
        self.cache.invalidate(user_id).await;
        message
    }
}

impl Default for FlashMessages {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
