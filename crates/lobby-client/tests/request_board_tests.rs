//! Host-side request board flows against a mock backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::types::{Decision, SessionId};
use lobby_client::errors::LobbyError;
use lobby_client::notify::NotificationLevel;
use lobby_client::page::TextInput;
use lobby_client::requests::{BoardContent, RequestBoard, RequestList, EMPTY_PLACEHOLDER};
use lobby_test_utils::*;
use serde_json::json;

const ROOM: &str = "AB12";
const SESSION: i64 = 7;

fn board_for(backend: &MockBackend, page: Arc<StaticPage>) -> (RequestBoard, Arc<RecordingNotifier>) {
    let notifier = RecordingNotifier::new();
    let board = RequestBoard::new(backend.client(), notifier.clone(), page);
    (board, notifier)
}

fn usernames(board: &RequestBoard) -> Vec<String> {
    board
        .list()
        .content()
        .unwrap()
        .rows()
        .iter()
        .map(|r| r.username.clone())
        .collect()
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_handled_request_disappears_on_next_poll() {
    let backend = MockBackend::start().await;
    backend
        .mount_get_sequence(
            &session_requests_path(ROOM),
            vec![requests_ok(&["alice", "bob"]), requests_ok(&["bob"])],
        )
        .await;
    let (board, _) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    board.poll_once(ROOM).await.unwrap();
    assert_eq!(usernames(&board), vec!["alice", "bob"]);

    board.poll_once(ROOM).await.unwrap();
    assert_eq!(usernames(&board), vec!["bob"]);
}

#[tokio::test]
async fn test_rows_render_whatever_the_timestamp_format() {
    let backend = MockBackend::start().await;
    backend
        .mount_get(
            &session_requests_path(ROOM),
            200,
            requests_with_joined_at(&[
                ("alice", json!("2024-05-01T12:00:00+00:00")),
                ("bob", json!("2024-05-01 12:30:00.123456")),
                ("carol", json!("sometime")),
            ]),
        )
        .await;
    let (board, _) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    board.poll_once(ROOM).await.unwrap();

    let content = board.list().content().unwrap();
    let rows = content.rows();
    let stamps: Vec<_> = rows
        .iter()
        .map(|r| (r.username.as_str(), r.joined_at))
        .collect();
    assert_eq!(
        stamps,
        vec![
            ("alice", Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())),
            (
                "bob",
                Some(
                    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
                        + chrono::Duration::microseconds(123_456)
                )
            ),
            ("carol", None),
        ]
    );
    // The unreadable row is still actionable.
    let carol = rows.iter().find(|r| r.username == "carol").unwrap();
    assert_eq!(carol.reject.decision, Decision::Rejected);
}

#[tokio::test]
async fn test_empty_requests_show_placeholder() {
    let backend = MockBackend::start().await;
    backend
        .mount_get(&session_requests_path(ROOM), 200, requests_ok(&[]))
        .await;
    let (board, _) = board_for(&backend, StaticPage::host(ROOM, SESSION));
    assert_eq!(board.list().content(), Some(BoardContent::Loading));

    board.poll_once(ROOM).await.unwrap();

    let content = board.list().content().unwrap();
    assert_eq!(content, BoardContent::Empty);
    assert_eq!(content.placeholder(), Some(EMPTY_PLACEHOLDER));
    assert!(content.rows().is_empty());
}

#[tokio::test]
async fn test_non_ok_response_keeps_previous_rows() {
    let backend = MockBackend::start().await;
    backend
        .mount_get_sequence(
            &session_requests_path(ROOM),
            vec![requests_ok(&["alice"]), action_error(Some("Not the host"))],
        )
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    board.poll_once(ROOM).await.unwrap();
    assert!(board.poll_once(ROOM).await.is_err());

    assert_eq!(usernames(&board), vec!["alice"]);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_poll_after_unmount_is_dropped() {
    let backend = MockBackend::start().await;
    backend
        .mount_get(&session_requests_path(ROOM), 200, requests_ok(&["alice"]))
        .await;
    let list = RequestList::new();
    let (board, _) = board_for(&backend, StaticPage::host(ROOM, SESSION));
    let board = board.with_list(list.clone());

    list.unmount();
    board.poll_once(ROOM).await.unwrap();

    assert_eq!(list.content(), None);
}

#[tokio::test]
async fn test_start_polls_page_room() {
    let backend = MockBackend::start().await;
    backend
        .mount_get(&session_requests_path(ROOM), 200, requests_ok(&["alice"]))
        .await;
    let (board, _) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    let handle = board.start(Duration::from_millis(20)).unwrap();
    wait_for("rows rendered", || {
        board
            .list()
            .content()
            .is_some_and(|c| c.rows().len() == 1)
    })
    .await;
    handle.cancel();

    assert!(backend.count("GET", &session_requests_path(ROOM)).await >= 1);
}

#[tokio::test]
async fn test_start_without_room_code_fails() {
    let backend = MockBackend::start().await;
    let (board, _) = board_for(&backend, StaticPage::blank());

    let result = board.start(Duration::from_millis(20));

    assert!(matches!(result, Err(LobbyError::MissingContext(_))));
    assert_eq!(backend.total_requests().await, 0);
}

// ============================================================================
// Row actions
// ============================================================================

#[tokio::test]
async fn test_click_sends_captured_identity() {
    let backend = MockBackend::start().await;
    backend
        .mount_get(&session_requests_path(ROOM), 200, requests_ok(&["alice", "bob"]))
        .await;
    backend
        .mount_post(HANDLE_REQUEST_PATH, 200, action_ok(None))
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));
    board.poll_once(ROOM).await.unwrap();

    let content = board.list().content().unwrap();
    let bob = content.rows().iter().find(|r| r.username == "bob").unwrap();
    board.click(&bob.approve).unwrap().await.unwrap();

    let sent = backend.requests_to("POST", HANDLE_REQUEST_PATH).await;
    assert_eq!(sent.len(), 1);
    let form = form_fields(sent.first().unwrap());
    assert_eq!(form.get("username").map(String::as_str), Some("bob"));
    assert_eq!(form.get("session_id").map(String::as_str), Some("7"));
    assert_eq!(form.get("action").map(String::as_str), Some("accepted"));

    assert_eq!(
        notifier.all(),
        vec![(NotificationLevel::Success, "bob approved".to_string())]
    );
    // No optimistic update: the row stays until the next poll.
    assert_eq!(usernames(&board), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_reject_decision_message() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(HANDLE_REQUEST_PATH, 200, action_ok(None))
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    board.handle_decision("carol", Decision::Rejected).await;

    assert_eq!(
        notifier.all(),
        vec![(NotificationLevel::Success, "carol rejected".to_string())]
    );
}

#[tokio::test]
async fn test_decision_errors() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(HANDLE_REQUEST_PATH, 403, json!({ "error": "Not the host" }))
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));
    board.handle_decision("alice", Decision::Accepted).await;
    assert_eq!(
        notifier.last(),
        Some((NotificationLevel::Error, "Not the host".to_string()))
    );

    backend.reset().await;
    backend
        .mount_post(HANDLE_REQUEST_PATH, 400, action_error(None))
        .await;
    board.handle_decision("alice", Decision::Accepted).await;
    assert_eq!(
        notifier.last(),
        Some((NotificationLevel::Error, "Error handling request".to_string()))
    );
}

#[tokio::test]
async fn test_decision_transport_failure_uses_generic_message() {
    let notifier = RecordingNotifier::new();
    let board = RequestBoard::new(
        unreachable_client(),
        notifier.clone(),
        StaticPage::host(ROOM, SESSION),
    );

    board.handle_decision("alice", Decision::Accepted).await;

    assert_eq!(
        notifier.all(),
        vec![(
            NotificationLevel::Error,
            "Failed to handle request".to_string()
        )]
    );
}

#[tokio::test]
async fn test_decision_without_session_id_sends_nothing() {
    let backend = MockBackend::start().await;
    let page = StaticPage::host(ROOM, SESSION);
    page.set_session_id(None);
    let (board, notifier) = board_for(&backend, page);

    board.handle_decision("alice", Decision::Accepted).await;

    assert_eq!(backend.total_requests().await, 0);
    let (level, message) = notifier.last().unwrap();
    assert_eq!(level, NotificationLevel::Error);
    assert!(!message.is_empty());
}

// ============================================================================
// Invites
// ============================================================================

#[tokio::test]
async fn test_blank_username_sends_nothing() {
    let backend = MockBackend::start().await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    board.invite("  ", SessionId(SESSION)).await;

    assert_eq!(backend.total_requests().await, 0);
    assert_eq!(
        notifier.all(),
        vec![(
            NotificationLevel::Warning,
            "Please enter a username".to_string()
        )]
    );
}

#[tokio::test]
async fn test_invite_success_clears_input() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(INVITE_PATH, 200, action_ok(Some("Invitation sent to dave")))
        .await;
    let input = TextInput::new();
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));
    let board = board.with_invite_input(input.clone());

    input.set("dave");
    board.submit_invite().await;

    let sent = backend.requests_to("POST", INVITE_PATH).await;
    let form = form_fields(sent.first().unwrap());
    assert_eq!(form.get("username").map(String::as_str), Some("dave"));
    assert_eq!(form.get("session_id").map(String::as_str), Some("7"));

    assert_eq!(
        notifier.all(),
        vec![(
            NotificationLevel::Success,
            "Invitation sent to dave".to_string()
        )]
    );
    assert_eq!(input.value(), "");
}

#[tokio::test]
async fn test_invite_failure_keeps_input() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(INVITE_PATH, 404, json!({ "error": "User not found" }))
        .await;
    let input = TextInput::new();
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));
    let board = board.with_invite_input(input.clone());

    input.set("nobody");
    board.submit_invite().await;

    assert_eq!(
        notifier.last(),
        Some((NotificationLevel::Error, "User not found".to_string()))
    );
    assert_eq!(input.value(), "nobody");
}

#[tokio::test]
async fn test_invite_error_without_message_uses_fallback() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(INVITE_PATH, 200, action_error(None))
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    board.invite("dave", SessionId(SESSION)).await;

    assert_eq!(
        notifier.last(),
        Some((
            NotificationLevel::Error,
            "Failed to send invitation".to_string()
        ))
    );
}

#[tokio::test]
async fn test_invite_transport_failure_uses_generic_message() {
    let notifier = RecordingNotifier::new();
    let input = TextInput::new();
    let board = RequestBoard::new(
        unreachable_client(),
        notifier.clone(),
        StaticPage::host(ROOM, SESSION),
    )
    .with_invite_input(input.clone());

    input.set("dave");
    board.submit_invite().await;

    assert_eq!(
        notifier.all(),
        vec![(
            NotificationLevel::Error,
            "Error sending invitation".to_string()
        )]
    );
    assert_eq!(input.value(), "dave");
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn test_toggle_discoverability() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(&toggle_discovery_path(ROOM), 200, visibility_ok(true))
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    let visibility = board.toggle_discoverability().await.unwrap();

    assert!(visibility.is_discoverable);
    assert_eq!(
        notifier.all(),
        vec![(
            NotificationLevel::Success,
            "Session is now discoverable".to_string()
        )]
    );
}

#[tokio::test]
async fn test_toggle_failure_uses_fallback() {
    let backend = MockBackend::start().await;
    backend
        .mount_post(&toggle_discovery_path(ROOM), 403, json!({}))
        .await;
    let (board, notifier) = board_for(&backend, StaticPage::host(ROOM, SESSION));

    assert!(board.toggle_discoverability().await.is_none());
    assert_eq!(
        notifier.last(),
        Some((
            NotificationLevel::Error,
            "Failed to update session visibility".to_string()
        ))
    );
}
