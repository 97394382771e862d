//! Polling helpers for conditions that settle asynchronously.

use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it holds or `limit` elapses.
///
/// Returns whether the condition held before the deadline.
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
