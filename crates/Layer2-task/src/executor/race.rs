//! Timeout race shared by every exec-based operation

use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound on the on-timeout cleanup
pub const MAX_CLEANUP: Duration = Duration::from_secs(5);

/// Outcome of racing work against a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raced<T> {
    Finished(T),
    TimedOut,
}

impl<T> Raced<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Raced::TimedOut)
    }
}

/// Run `work` until it completes or `limit` elapses.
///
/// On timeout `work` is dropped (releasing whatever it borrowed) and
/// `on_timeout`, if any, is awaited for at most `min(limit, MAX_CLEANUP)`.
/// Cleanup never fails or stalls the caller.
pub async fn race<F, T>(
    work: F,
    limit: Duration,
    on_timeout: Option<BoxFuture<'_, ()>>,
) -> Raced<T>
where
    F: Future<Output = T>,
{
    match timeout(limit, work).await {
        Ok(value) => Raced::Finished(value),
        Err(_) => {
            debug!(limit_ms = limit.as_millis() as u64, "Work timed out");
            if let Some(cleanup) = on_timeout {
                let bound = limit.min(MAX_CLEANUP);
                if timeout(bound, cleanup).await.is_err() {
                    warn!(bound_ms = bound.as_millis() as u64, "Timeout cleanup abandoned");
                }
            }
            Raced::TimedOut
        }
    }
}
