//! Transient user-facing notifications.
//!
//! Components report outcomes through the [`NotificationSink`] trait, which
//! never blocks and never fails. [`NotificationCenter`] is the standard sink:
//! it publishes the visible stack over a `watch` channel and removes each
//! entry on its own schedule (fully visible for the TTL, then `dismissing`
//! for a short exit animation, then gone).

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default time a notification stays fully visible.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(4000);

/// Time between a notification starting to dismiss and being removed.
pub const DEFAULT_EXIT_DURATION: Duration = Duration::from_millis(300);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// One visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    /// Set once the display time is over and the exit animation runs.
    pub dismissing: bool,
}

/// Ephemeral, non-blocking feedback channel.
pub trait NotificationSink: Send + Sync {
    /// Show `message` to the user. Must return immediately.
    fn notify(&self, level: NotificationLevel, message: String);
}

/// Auto-dismissing notification stack.
///
/// Cheap to clone; clones share the same stack.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<CenterInner>,
}

struct CenterInner {
    sender: watch::Sender<Vec<Notification>>,
    ttl: Duration,
    exit: Duration,
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("visible", &self.inner.sender.borrow().len())
            .field("ttl", &self.inner.ttl)
            .field("exit", &self.inner.exit)
            .finish()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationCenter {
    /// Create a center whose notifications stay visible for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_exit_duration(ttl, DEFAULT_EXIT_DURATION)
    }

    /// Create a center with an explicit exit-animation duration.
    #[must_use]
    pub fn with_exit_duration(ttl: Duration, exit: Duration) -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(CenterInner { sender, ttl, exit }),
        }
    }

    /// Subscribe to changes of the visible stack.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.sender.subscribe()
    }

    /// Snapshot of the visible stack, oldest first.
    #[must_use]
    pub fn visible(&self) -> Vec<Notification> {
        self.inner.sender.borrow().clone()
    }

    fn schedule_dismiss(&self, runtime: &tokio::runtime::Handle, id: Uuid) {
        // Deadlines count from creation, not from the task's first poll.
        let dismiss_at = Instant::now() + self.inner.ttl;
        let remove_at = dismiss_at + self.inner.exit;
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            tokio::time::sleep_until(dismiss_at).await;
            inner.sender.send_if_modified(|stack| {
                match stack.iter_mut().find(|n| n.id == id) {
                    Some(n) => {
                        n.dismissing = true;
                        true
                    }
                    None => false,
                }
            });

            tokio::time::sleep_until(remove_at).await;
            inner.sender.send_if_modified(|stack| {
                let before = stack.len();
                stack.retain(|n| n.id != id);
                stack.len() != before
            });
            debug!(target: "lobby.notify", id = %id, "Notification dismissed");
        });
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&self, level: NotificationLevel, message: String) {
        match level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(target: "lobby.notify", level = ?level, message = %message, "Notification");
            }
            NotificationLevel::Warning | NotificationLevel::Error => {
                warn!(target: "lobby.notify", level = ?level, message = %message, "Notification");
            }
        }

        // An entry that cannot be dismissed would stay on the stack forever.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                target: "lobby.notify",
                "No async runtime available, notification logged but not shown"
            );
            return;
        };

        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message,
            dismissing: false,
        };
        let id = notification.id;
        self.inner.sender.send_modify(|stack| stack.push(notification));
        self.schedule_dismiss(&runtime, id);
    }
}
