//! Polling assertion for effects that happen on spawned tasks.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default time allowed for a condition to become true.
pub const DEFAULT_EVENTUAL_TIMEOUT: Duration = Duration::from_secs(5);

const CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Wait until `condition` returns true, or fail after `timeout`.
///
/// Returns an error message naming `what` on timeout.
pub async fn assert_eventually<F, Fut>(
    what: &str,
    timeout: Duration,
    mut condition: F,
) -> Result<(), String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(format!("Condition not met within {timeout:?}: {what}"));
        }
        sleep(CHECK_INTERVAL).await;
    }
}

/// [`assert_eventually`] for a synchronous check, panicking on timeout.
pub async fn wait_for<F>(what: &str, mut check: F)
where
    F: FnMut() -> bool,
{
    assert_eventually(what, DEFAULT_EVENTUAL_TIMEOUT, || {
        let ok = check();
        async move { ok }
    })
    .await
    .unwrap();
}
