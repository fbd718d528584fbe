//! Host-side request board.
//!
//! Polls the join requests of the room shown on the page and renders them as
//! rows with approve/reject actions. Each poll fully replaces the list, so a
//! request that was handled elsewhere disappears on the next tick. Actions
//! never edit the list optimistically.

use crate::client::{ActionClient, JoinRequest, Visibility};
use crate::errors::{require_non_blank, LobbyError, Result};
use crate::notify::{NotificationLevel, NotificationSink};
use crate::page::{PageContext, TextInput};
use crate::poll::{start_polling, PollHandle};
use crate::spawn_detached;
use chrono::{DateTime, Utc};
use common::types::{Decision, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Placeholder shown when the room has no pending requests.
pub const EMPTY_PLACEHOLDER: &str = "No pending requests";

const HANDLE_REJECTED_FALLBACK: &str = "Error handling request";
const HANDLE_TRANSPORT_FALLBACK: &str = "Failed to handle request";

const EMPTY_USERNAME_WARNING: &str = "Please enter a username";
const INVITE_SENT_FALLBACK: &str = "Invitation sent";
const INVITE_REJECTED_FALLBACK: &str = "Failed to send invitation";
const INVITE_TRANSPORT_FALLBACK: &str = "Error sending invitation";

const VISIBILITY_FALLBACK: &str = "Failed to update session visibility";

/// Action bound to one rendered row. Captures the row's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAction {
    pub username: String,
    pub decision: Decision,
}

/// One rendered join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    pub username: String,
    /// `None` when the backend sent a timestamp that could not be read.
    pub joined_at: Option<DateTime<Utc>>,
    pub approve: RowAction,
    pub reject: RowAction,
}

impl From<JoinRequest> for RequestRow {
    fn from(request: JoinRequest) -> Self {
        Self {
            approve: RowAction {
                username: request.username.clone(),
                decision: Decision::Accepted,
            },
            reject: RowAction {
                username: request.username.clone(),
                decision: Decision::Rejected,
            },
            username: request.username,
            joined_at: request.joined_at,
        }
    }
}

/// What the request container currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardContent {
    /// Nothing fetched yet.
    Loading,
    /// Fetched, no pending requests.
    Empty,
    Rows(Vec<RequestRow>),
}

impl BoardContent {
    #[must_use]
    pub fn from_requests(requests: Vec<JoinRequest>) -> Self {
        if requests.is_empty() {
            Self::Empty
        } else {
            Self::Rows(requests.into_iter().map(RequestRow::from).collect())
        }
    }

    /// Placeholder text, for the empty state only.
    #[must_use]
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Empty => Some(EMPTY_PLACEHOLDER),
            Self::Loading | Self::Rows(_) => None,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[RequestRow] {
        match self {
            Self::Rows(rows) => rows,
            Self::Loading | Self::Empty => &[],
        }
    }
}

/// Container the board renders into.
///
/// Holds `None` while unmounted; renders into an unmounted list are dropped.
#[derive(Debug, Clone)]
pub struct RequestList {
    state: Arc<watch::Sender<Option<BoardContent>>>,
}

impl Default for RequestList {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestList {
    /// A mounted list showing [`BoardContent::Loading`].
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Some(BoardContent::Loading));
        Self {
            state: Arc::new(state),
        }
    }

    /// A list that is not mounted yet.
    #[must_use]
    pub fn unmounted() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Mount the list. No-op if already mounted.
    pub fn mount(&self) {
        self.state.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(BoardContent::Loading);
            true
        });
    }

    pub fn unmount(&self) {
        self.state.send_if_modified(|slot| slot.take().is_some());
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Current content, `None` while unmounted.
    #[must_use]
    pub fn content(&self) -> Option<BoardContent> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<BoardContent>> {
        self.state.subscribe()
    }

    /// Replace the content with `requests`.
    ///
    /// Returns `false` when the list is unmounted.
    pub fn render(&self, requests: Vec<JoinRequest>) -> bool {
        self.state.send_if_modified(move |slot| match slot {
            Some(content) => {
                *content = BoardContent::from_requests(requests);
                true
            }
            None => false,
        })
    }
}

/// Host-side consumer of a room's join requests.
#[derive(Clone)]
pub struct RequestBoard {
    client: ActionClient,
    notifier: Arc<dyn NotificationSink>,
    page: Arc<dyn PageContext>,
    list: RequestList,
    invite_input: Option<TextInput>,
}

impl std::fmt::Debug for RequestBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBoard")
            .field("client", &self.client)
            .field("list", &self.list)
            .field("invite_input", &self.invite_input)
            .finish_non_exhaustive()
    }
}

impl RequestBoard {
    #[must_use]
    pub fn new(
        client: ActionClient,
        notifier: Arc<dyn NotificationSink>,
        page: Arc<dyn PageContext>,
    ) -> Self {
        Self {
            client,
            notifier,
            page,
            list: RequestList::new(),
            invite_input: None,
        }
    }

    /// Render into `list` instead of a fresh one.
    #[must_use]
    pub fn with_list(mut self, list: RequestList) -> Self {
        self.list = list;
        self
    }

    /// Bind the invite form input; it is cleared after a successful invite.
    #[must_use]
    pub fn with_invite_input(mut self, input: TextInput) -> Self {
        self.invite_input = Some(input);
        self
    }

    #[must_use]
    pub fn list(&self) -> &RequestList {
        &self.list
    }

    fn room_code(&self) -> Result<String> {
        self.page
            .current_room_code()
            .ok_or(LobbyError::MissingContext("room code"))
    }

    fn session_id(&self) -> Result<SessionId> {
        self.page
            .current_session_id()
            .and_then(|raw| raw.parse().ok())
            .ok_or(LobbyError::MissingContext("session id"))
    }

    /// Start polling the page's room every `interval`.
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::MissingContext` if the page has no room code.
    #[must_use = "polling stops when the handle is dropped"]
    pub fn start(&self, interval: Duration) -> Result<PollHandle> {
        let room_code = self.room_code()?;
        info!(target: "lobby.requests", room_code = %room_code, "Watching join requests");

        let board = self.clone();
        Ok(start_polling("join-requests", interval, move || {
            let board = board.clone();
            let room_code = room_code.clone();
            async move { board.poll_once(&room_code).await }
        }))
    }

    /// One poll tick: fetch the room's requests and replace the list.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the poll loop logs it and keeps going.
    #[instrument(skip_all, fields(room_code = %room_code))]
    pub async fn poll_once(&self, room_code: &str) -> Result<()> {
        let requests = self.client.session_requests(room_code).await?;
        let count = requests.len();
        if self.list.render(requests) {
            debug!(target: "lobby.requests", pending = count, "Rendered join requests");
        } else {
            debug!(target: "lobby.requests", "Request list unmounted, dropping render");
        }
        Ok(())
    }

    /// Run the action bound to a rendered row.
    pub fn click(&self, action: &RowAction) -> Option<JoinHandle<()>> {
        let board = self.clone();
        let RowAction { username, decision } = action.clone();
        spawn_detached(async move {
            board.handle_decision(&username, decision).await;
        })
    }

    /// Approve or reject `username`'s join request for the page's session.
    #[instrument(skip_all, fields(username = %username, action = %decision))]
    pub async fn handle_decision(&self, username: &str, decision: Decision) {
        let result = match self.session_id() {
            Ok(session_id) => {
                self.client
                    .handle_request(username, session_id, decision)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => {
                info!(target: "lobby.requests", "Join request handled");
                self.notifier.notify(
                    NotificationLevel::Success,
                    format!("{username} {}", decision.outcome()),
                );
            }
            Err(e) => {
                warn!(target: "lobby.requests", error = %e, "Handling join request failed");
                self.notifier.notify(
                    NotificationLevel::Error,
                    e.user_message(HANDLE_REJECTED_FALLBACK, HANDLE_TRANSPORT_FALLBACK),
                );
            }
        }
    }

    /// Invite `username` to `session_id`.
    ///
    /// Blank names are refused locally with a warning.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn invite(&self, username: &str, session_id: SessionId) {
        let username = match require_non_blank(username, EMPTY_USERNAME_WARNING) {
            Ok(username) => username,
            Err(e) => {
                self.notifier.notify(
                    NotificationLevel::Warning,
                    e.user_message(EMPTY_USERNAME_WARNING, EMPTY_USERNAME_WARNING),
                );
                return;
            }
        };

        match self.client.invite(username, session_id).await {
            Ok(success) => {
                info!(target: "lobby.requests", username = %username, "Invitation sent");
                self.notifier.notify(
                    NotificationLevel::Success,
                    success
                        .message
                        .unwrap_or_else(|| INVITE_SENT_FALLBACK.to_string()),
                );
                if let Some(input) = &self.invite_input {
                    input.clear();
                }
            }
            Err(e) => {
                warn!(target: "lobby.requests", username = %username, error = %e, "Invitation failed");
                self.notifier.notify(
                    NotificationLevel::Error,
                    e.user_message(INVITE_REJECTED_FALLBACK, INVITE_TRANSPORT_FALLBACK),
                );
            }
        }
    }

    /// Submit the bound invite input for the page's session.
    pub async fn submit_invite(&self) {
        let username = self
            .invite_input
            .as_ref()
            .map(TextInput::value)
            .unwrap_or_default();

        match self.session_id() {
            Ok(session_id) => self.invite(&username, session_id).await,
            Err(e) => {
                warn!(target: "lobby.requests", error = %e, "Cannot invite without a session");
                self.notifier.notify(
                    NotificationLevel::Error,
                    e.user_message(INVITE_REJECTED_FALLBACK, INVITE_TRANSPORT_FALLBACK),
                );
            }
        }
    }

    /// Flip whether the page's session is listed in the directory.
    ///
    /// Returns the new visibility on success.
    #[instrument(skip_all)]
    pub async fn toggle_discoverability(&self) -> Option<Visibility> {
        let result = match self.room_code() {
            Ok(room_code) => self.client.toggle_discoverability(&room_code).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(visibility) => {
                info!(
                    target: "lobby.requests",
                    is_discoverable = visibility.is_discoverable,
                    "Session visibility updated"
                );
                let message = visibility.message.clone().unwrap_or_else(|| {
                    if visibility.is_discoverable {
                        "Session is now discoverable".to_string()
                    } else {
                        "Session is now hidden".to_string()
                    }
                });
                self.notifier.notify(NotificationLevel::Success, message);
                Some(visibility)
            }
            Err(e) => {
                warn!(target: "lobby.requests", error = %e, "Visibility toggle failed");
                self.notifier.notify(
                    NotificationLevel::Error,
                    e.user_message(VISIBILITY_FALLBACK, VISIBILITY_FALLBACK),
                );
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(username: &str) -> JoinRequest {
        JoinRequest {
            username: username.to_string(),
            joined_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_empty_requests_render_placeholder() {
        let content = BoardContent::from_requests(vec![]);
        assert_eq!(content, BoardContent::Empty);
        assert_eq!(content.placeholder(), Some(EMPTY_PLACEHOLDER));
        assert!(content.rows().is_empty());
    }

    #[test]
    fn test_loading_is_distinct_from_empty() {
        assert_ne!(BoardContent::Loading, BoardContent::Empty);
        assert_eq!(BoardContent::Loading.placeholder(), None);
    }

    #[test]
    fn test_row_actions_capture_username() {
        let content = BoardContent::from_requests(vec![request("bob"), request("carol")]);
        let rows = content.rows();
        assert_eq!(rows.len(), 2);

        let carol = rows.get(1).unwrap();
        assert_eq!(carol.username, "carol");
        assert_eq!(
            carol.approve,
            RowAction {
                username: "carol".to_string(),
                decision: Decision::Accepted,
            }
        );
        assert_eq!(carol.reject.decision, Decision::Rejected);
        assert_eq!(carol.reject.username, "carol");
    }

    #[test]
    fn test_render_replaces_rows() {
        let list = RequestList::new();
        assert_eq!(list.content(), Some(BoardContent::Loading));

        assert!(list.render(vec![request("a"), request("b")]));
        assert!(list.render(vec![request("b")]));

        let content = list.content().unwrap();
        let names: Vec<_> = content.rows().iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_render_into_unmounted_list_is_noop() {
        let list = RequestList::unmounted();
        let mut rx = list.subscribe();

        assert!(!list.render(vec![request("a")]));
        assert_eq!(list.content(), None);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_unmount_and_remount() {
        let list = RequestList::new();
        list.render(vec![request("a")]);

        list.unmount();
        assert!(!list.is_mounted());
        assert!(!list.render(vec![request("b")]));

        list.mount();
        assert_eq!(list.content(), Some(BoardContent::Loading));
    }
}
