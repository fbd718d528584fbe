//! Participant-side invitation sync.
//!
//! Polls the current user's pending invitations and surfaces them one at a
//! time through a single prompt slot. While a prompt waits for the user, later
//! poll ticks leave it alone, so a burst of pending invitations never stacks
//! prompts. The user's choice tears the prompt down immediately and is then
//! sent to the backend; a failed answer is reported and the still-pending
//! invitation comes back on a later tick.
//!
//! Joining by room code lives here too since it is the other participant
//! entry point.

use crate::client::{ActionClient, Invitation};
use crate::errors::{require_non_blank, Result};
use crate::notify::{NotificationLevel, NotificationSink};
use crate::page::{schedule_navigation, Navigation, Navigator};
use crate::poll::{start_polling, PollHandle};
use crate::spawn_detached;
use common::types::{Decision, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Default delay before reloading into an accepted session.
pub const DEFAULT_NAVIGATION_DELAY: Duration = Duration::from_millis(1500);

const ACCEPTED_MESSAGE: &str = "Invitation accepted! Redirecting to session...";
const REJECTED_MESSAGE: &str = "Invitation rejected.";
const RESPOND_REJECTED_FALLBACK: &str = "Error processing invitation";
const RESPOND_TRANSPORT_FALLBACK: &str = "Failed to process invitation";

const EMPTY_CODE_WARNING: &str = "Please enter a room code";
const JOIN_SUBMITTED_FALLBACK: &str = "Join request submitted.";
const JOIN_REJECTED_FALLBACK: &str = "Failed to join session";
const JOIN_TRANSPORT_FALLBACK: &str = "Error joining session";

/// The invitation currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationPrompt {
    pub invitation: Invitation,
    /// Human-readable prompt body.
    pub text: String,
}

impl InvitationPrompt {
    #[must_use]
    pub fn new(invitation: Invitation) -> Self {
        let text = format!(
            "{} invited you to join session {}",
            invitation.host_username, invitation.room_code
        );
        Self { invitation, text }
    }
}

/// Participant-side consumer of the invitation list.
///
/// Cheap to clone; clones share the prompt slot.
#[derive(Clone)]
pub struct InvitationSync {
    client: ActionClient,
    notifier: Arc<dyn NotificationSink>,
    navigator: Arc<dyn Navigator>,
    prompt: Arc<watch::Sender<Option<InvitationPrompt>>>,
    navigation_delay: Duration,
}

impl std::fmt::Debug for InvitationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationSync")
            .field("client", &self.client)
            .field("prompt", &*self.prompt.borrow())
            .field("navigation_delay", &self.navigation_delay)
            .finish_non_exhaustive()
    }
}

impl InvitationSync {
    #[must_use]
    pub fn new(
        client: ActionClient,
        notifier: Arc<dyn NotificationSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (prompt, _) = watch::channel(None);
        Self {
            client,
            notifier,
            navigator,
            prompt: Arc::new(prompt),
            navigation_delay: DEFAULT_NAVIGATION_DELAY,
        }
    }

    /// Set the delay before reload/redirect after a successful action.
    #[must_use]
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    /// Start polling for invitations every `interval`.
    #[must_use = "polling stops when the handle is dropped"]
    pub fn start(&self, interval: Duration) -> PollHandle {
        let sync = self.clone();
        start_polling("invitations", interval, move || {
            let sync = sync.clone();
            async move { sync.poll_once().await }
        })
    }

    /// One poll tick: fetch pending invitations and present the first.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the poll loop logs it and keeps going.
    #[instrument(skip_all)]
    pub async fn poll_once(&self) -> Result<()> {
        let invitations = self.client.my_invitations().await?;
        debug!(
            target: "lobby.invitations",
            pending = invitations.len(),
            "Fetched pending invitations"
        );

        if let Some(first) = invitations.into_iter().next() {
            self.present(first);
        }
        Ok(())
    }

    /// Show `invitation` unless a prompt is already visible.
    ///
    /// Returns `true` when a new prompt was created.
    pub fn present(&self, invitation: Invitation) -> bool {
        let session_id = invitation.session_id;
        let created = self.prompt.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(InvitationPrompt::new(invitation));
            true
        });

        if created {
            info!(target: "lobby.invitations", session_id = %session_id, "Presenting invitation");
        } else {
            debug!(
                target: "lobby.invitations",
                session_id = %session_id,
                "Prompt already visible, skipping invitation"
            );
        }
        created
    }

    /// Snapshot of the visible prompt.
    #[must_use]
    pub fn prompt(&self) -> Option<InvitationPrompt> {
        self.prompt.borrow().clone()
    }

    /// Subscribe to prompt changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<InvitationPrompt>> {
        self.prompt.subscribe()
    }

    /// Answer the visible prompt.
    ///
    /// The prompt is removed before the answer is sent. Returns the task
    /// sending it, or `None` when no prompt is visible (or no runtime is
    /// available, in which case the prompt is left in place).
    pub fn choose(&self, decision: Decision) -> Option<JoinHandle<()>> {
        tokio::runtime::Handle::try_current().ok()?;

        let mut taken = None;
        self.prompt.send_if_modified(|slot| {
            taken = slot.take();
            taken.is_some()
        });
        let prompt = taken?;

        let sync = self.clone();
        spawn_detached(async move {
            sync.respond(prompt.invitation.session_id, decision).await;
        })
    }

    /// Accept the visible prompt.
    pub fn accept(&self) -> Option<JoinHandle<()>> {
        self.choose(Decision::Accepted)
    }

    /// Reject the visible prompt.
    pub fn reject(&self) -> Option<JoinHandle<()>> {
        self.choose(Decision::Rejected)
    }

    /// Send an answer to an invitation and report the outcome.
    ///
    /// Accepting schedules one reload into the joined session.
    #[instrument(skip_all, fields(session_id = %session_id, action = %decision))]
    pub async fn respond(&self, session_id: SessionId, decision: Decision) {
        match self.client.respond_invite(session_id, decision).await {
            Ok(_) => match decision {
                Decision::Accepted => {
                    self.notifier
                        .notify(NotificationLevel::Success, ACCEPTED_MESSAGE.to_string());
                    schedule_navigation(
                        &self.navigator,
                        Navigation::Reload,
                        self.navigation_delay,
                    );
                }
                Decision::Rejected => {
                    self.notifier
                        .notify(NotificationLevel::Info, REJECTED_MESSAGE.to_string());
                }
            },
            Err(e) => {
                warn!(target: "lobby.invitations", error = %e, "Invitation response failed");
                self.notifier.notify(
                    NotificationLevel::Error,
                    e.user_message(RESPOND_REJECTED_FALLBACK, RESPOND_TRANSPORT_FALLBACK),
                );
            }
        }
    }

    /// Ask to join a session by room code.
    ///
    /// Blank codes are refused locally with a warning. On success the user is
    /// sent to the room's waiting page after the navigation delay.
    #[instrument(skip_all)]
    pub async fn join_with_code(&self, code: &str) {
        let code = match require_non_blank(code, EMPTY_CODE_WARNING) {
            Ok(code) => code,
            Err(e) => {
                self.notifier.notify(
                    NotificationLevel::Warning,
                    e.user_message(EMPTY_CODE_WARNING, EMPTY_CODE_WARNING),
                );
                return;
            }
        };

        match self.client.join_with_code(code).await {
            Ok(success) => {
                info!(target: "lobby.invitations", room_code = %code, "Join request submitted");
                self.notifier.notify(
                    NotificationLevel::Success,
                    success
                        .message
                        .unwrap_or_else(|| JOIN_SUBMITTED_FALLBACK.to_string()),
                );
                schedule_navigation(
                    &self.navigator,
                    Navigation::waiting_room(code),
                    self.navigation_delay,
                );
            }
            Err(e) => {
                warn!(target: "lobby.invitations", room_code = %code, error = %e, "Join by code failed");
                self.notifier.notify(
                    NotificationLevel::Error,
                    e.user_message(JOIN_REJECTED_FALLBACK, JOIN_TRANSPORT_FALLBACK),
                );
            }
        }
    }
}
