//! Participant waiting room.
//!
//! After a join-by-code the participant waits on `/session/{code}/waiting/`
//! while the host decides. The room polls the participant's own status and
//! resolves exactly once: into the session on approval, back home on decline.

use crate::client::ActionClient;
use crate::errors::{LobbyError, Result};
use crate::invitations::DEFAULT_NAVIGATION_DELAY;
use crate::notify::{NotificationLevel, NotificationSink};
use crate::page::{schedule_navigation, Navigation, Navigator, PageContext};
use crate::poll::{start_polling, PollHandle};
use common::types::ParticipantStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

const APPROVED_MESSAGE: &str = "Join request approved! Entering session...";
const DECLINED_MESSAGE: &str = "The host declined your request";

/// Where the waiting participant stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingState {
    Waiting,
    Approved,
    Declined,
}

/// Polls the participant's join-request status for one room.
#[derive(Clone)]
pub struct WaitingRoom {
    client: ActionClient,
    notifier: Arc<dyn NotificationSink>,
    navigator: Arc<dyn Navigator>,
    room_code: String,
    state: Arc<watch::Sender<WaitingState>>,
    navigation_delay: Duration,
}

impl std::fmt::Debug for WaitingRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingRoom")
            .field("room_code", &self.room_code)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl WaitingRoom {
    #[must_use]
    pub fn new(
        client: ActionClient,
        notifier: Arc<dyn NotificationSink>,
        navigator: Arc<dyn Navigator>,
        room_code: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(WaitingState::Waiting);
        Self {
            client,
            notifier,
            navigator,
            room_code: room_code.into(),
            state: Arc::new(state),
            navigation_delay: DEFAULT_NAVIGATION_DELAY,
        }
    }

    /// Build a waiting room for the room shown on `page`.
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::MissingContext` if the page has no room code.
    pub fn for_page(
        client: ActionClient,
        notifier: Arc<dyn NotificationSink>,
        navigator: Arc<dyn Navigator>,
        page: &dyn PageContext,
    ) -> Result<Self> {
        let room_code = page
            .current_room_code()
            .ok_or(LobbyError::MissingContext("room code"))?;
        Ok(Self::new(client, notifier, navigator, room_code))
    }

    #[must_use]
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    #[must_use]
    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    #[must_use]
    pub fn state(&self) -> WaitingState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WaitingState> {
        self.state.subscribe()
    }

    /// Start polling the status every `interval`.
    #[must_use = "polling stops when the handle is dropped"]
    pub fn start(&self, interval: Duration) -> PollHandle {
        let room = self.clone();
        start_polling("waiting-room", interval, move || {
            let room = room.clone();
            async move { room.poll_once().await }
        })
    }

    /// One poll tick. Skips the fetch once resolved.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the poll loop logs it and keeps going.
    #[instrument(skip_all, fields(room_code = %self.room_code))]
    pub async fn poll_once(&self) -> Result<()> {
        if self.state() != WaitingState::Waiting {
            return Ok(());
        }
        let report = self.client.check_status(&self.room_code).await?;
        self.apply(report.status);
        Ok(())
    }

    /// Apply a status report. Returns `true` if it resolved the room.
    pub fn apply(&self, status: ParticipantStatus) -> bool {
        let next = match status {
            ParticipantStatus::Accepted => WaitingState::Approved,
            ParticipantStatus::Rejected => WaitingState::Declined,
            other => {
                debug!(target: "lobby.waiting", status = ?other, "Still waiting");
                return false;
            }
        };

        let resolved = self.state.send_if_modified(|state| {
            if *state != WaitingState::Waiting {
                return false;
            }
            *state = next;
            true
        });
        if !resolved {
            return false;
        }

        info!(target: "lobby.waiting", room_code = %self.room_code, outcome = ?next, "Join request resolved");
        match next {
            WaitingState::Approved => {
                self.notifier
                    .notify(NotificationLevel::Success, APPROVED_MESSAGE.to_string());
                schedule_navigation(
                    &self.navigator,
                    Navigation::session_room(&self.room_code),
                    self.navigation_delay,
                );
            }
            WaitingState::Declined => {
                self.notifier
                    .notify(NotificationLevel::Error, DECLINED_MESSAGE.to_string());
                schedule_navigation(&self.navigator, Navigation::home(), self.navigation_delay);
            }
            WaitingState::Waiting => {}
        }
        true
    }
}
