//! Best-effort batches: every sub-request runs, failures are logged per item.

use futures::future::join_all;
use std::future::Future;
use tracing::error;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub success: usize,
    pub failure: usize,
}

/// Run every `(request_id, future)` concurrently and wait for all of them.
///
/// Returns the tally plus the successful results, in submission order.
pub async fn run_batch<T, F>(label: &str, requests: Vec<(String, F)>) -> (BatchOutcome, Vec<(String, T)>)
where
    F: Future<Output = Result<T, AppError>>,
{
    let results = join_all(
        requests
            .into_iter()
            .map(|(id, fut)| async move { (id, fut.await) }),
    )
    .await;

    let mut outcome = BatchOutcome::default();
    let mut ok = Vec::with_capacity(results.len());
    for (id, result) in results {
        match result {
            Ok(value) => {
                outcome.success += 1;
                ok.push((id, value));
            }
            Err(e) => {
                outcome.failure += 1;
                error!(request_id = %id, "{label} failed: {e}");
            }
        }
    }

    (outcome, ok)
}
