//! Fixed-interval polling primitive.
//!
//! [`start_polling`] runs a fetch-and-reconcile function immediately and then
//! once per elapsed interval until the returned [`PollHandle`] is cancelled.
//! Used by the invitation, request-board and waiting-room consumers.
//!
//! # Failure isolation
//!
//! Each tick's future runs in its own task. An `Err` is logged at `warn` and a
//! panicking fetch is logged as well; neither stops the loop. A slow fetch
//! never delays the next tick, so fetches of one loop may overlap. Consumers
//! treat every response as a full snapshot, which makes the last response to
//! arrive the one that wins.
//!
//! # Shutdown
//!
//! The loop has no self-termination condition. Cancelling the handle (or
//! dropping it) stops the ticker and aborts fetches still in flight.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Smallest interval accepted; shorter values are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running poll loop.
///
/// Exactly one handle exists per loop. The owner cancels it on navigation or
/// unmount; dropping the handle cancels as well.
#[derive(Debug)]
#[must_use = "dropping a PollHandle stops its poll loop"]
pub struct PollHandle {
    name: &'static str,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the loop and abort in-flight fetches. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            debug!(target: "lobby.poll", poll = self.name, "Cancelling poll loop");
        }
        self.cancel_token.cancel();
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Whether the loop task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Name given to the loop at start.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Start a poll loop.
///
/// `fetch` is invoked once immediately and then once per `interval`. Missed
/// ticks are skipped, not bursted.
///
/// # Arguments
///
/// * `name` - Loop name for log messages (e.g., "invitations")
/// * `interval` - Time between ticks
/// * `fetch` - Produces one tick's fetch-and-reconcile future
///
/// Must be called from within a Tokio runtime.
#[must_use = "the loop stops as soon as the returned handle is dropped"]
pub fn start_polling<F, Fut, E>(name: &'static str, interval: Duration, fetch: F) -> PollHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let interval = interval.max(MIN_POLL_INTERVAL);
    let cancel_token = CancellationToken::new();
    let loop_token = cancel_token.clone();

    info!(
        target: "lobby.poll",
        poll = name,
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        "Starting poll loop"
    );

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                () = loop_token.cancelled() => {
                    info!(target: "lobby.poll", poll = name, "Poll loop received shutdown signal, exiting");
                    break;
                }
                _ = ticker.tick() => {
                    let tick = fetch();
                    in_flight.spawn(async move {
                        if let Err(e) = tick.await {
                            warn!(target: "lobby.poll", poll = name, error = %e, "Poll tick failed");
                        }
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!(target: "lobby.poll", poll = name, "Poll tick panicked");
                        }
                    }
                }
            }
        }

        in_flight.abort_all();
    });

    PollHandle {
        name,
        cancel_token,
        task,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_fetch(
        count: &Arc<AtomicU32>,
    ) -> impl Fn() -> std::future::Ready<Result<(), String>> + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    async fn settle(by: Duration) {
        tokio::time::advance(by).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_immediately_then_every_interval() {
        let count = Arc::new(AtomicU32::new(0));
        let handle = start_polling("test", Duration::from_secs(2), counting_fetch(&count));

        // Initial tick happens before the first interval elapses
        settle(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        settle(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        for expected in 3..=6 {
            settle(Duration::from_secs(2)).await;
            assert_eq!(count.load(Ordering::SeqCst), expected);
        }

        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let count = Arc::new(AtomicU32::new(0));
        let handle = start_polling("test", Duration::from_secs(1), counting_fetch(&count));

        settle(Duration::from_millis(10)).await;
        settle(Duration::from_secs(1)).await;
        settle(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        assert!(handle.is_cancelled());
        settle(Duration::from_millis(10)).await;
        assert!(handle.is_finished());

        settle(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(AtomicU32::new(0));
        let handle = start_polling("test", Duration::from_secs(1), counting_fetch(&count));
        settle(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(handle);
        settle(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discarded_handle_stops_loop() {
        let count = Arc::new(AtomicU32::new(0));
        let _ = start_polling("test", Duration::from_secs(1), counting_fetch(&count));

        settle(Duration::from_millis(10)).await;
        for _ in 0..3 {
            settle(Duration::from_secs(1)).await;
        }
        assert!(count.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_loop() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let handle = start_polling("test", Duration::from_secs(1), move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 0 {
                    Err(format!("transient failure {n}"))
                } else {
                    Ok(())
                }
            }
        });

        settle(Duration::from_millis(10)).await;
        for _ in 0..4 {
            settle(Duration::from_secs(1)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 5);
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_does_not_stop_loop() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let handle = start_polling("test", Duration::from_secs(1), move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    panic!("first tick blows up");
                }
                Ok::<(), String>(())
            }
        });

        settle(Duration::from_millis(10)).await;
        settle(Duration::from_secs(1)).await;
        settle(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!handle.is_finished());
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_does_not_delay_ticks() {
        let started = Arc::new(AtomicU32::new(0));
        let s = Arc::clone(&started);
        let handle = start_polling("test", Duration::from_secs(1), move || {
            s.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), String>(())
            }
        });

        settle(Duration::from_millis(10)).await;
        for _ in 0..3 {
            settle(Duration::from_secs(1)).await;
        }
        assert_eq!(started.load(Ordering::SeqCst), 4);
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_fetch() {
        let completed = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&completed);
        let handle = start_polling("test", Duration::from_secs(60), move || {
            let done = Arc::clone(&done);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                done.store(true, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        });

        settle(Duration::from_millis(10)).await;
        handle.cancel();
        settle(Duration::from_secs(10)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let count = Arc::new(AtomicU32::new(0));
        let handle = start_polling("test", Duration::ZERO, counting_fetch(&count));
        settle(Duration::from_millis(5)).await;
        assert!(count.load(Ordering::SeqCst) >= 1);
        assert_eq!(handle.name(), "test");
        handle.cancel();
    }
}
