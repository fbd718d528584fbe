//! Mock lobby backend for client tests.
//!
//! Wraps a wiremock [`MockServer`] with the lobby's endpoint paths, canned
//! payload builders and helpers for inspecting what the client sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use lobby_test_utils::MockBackend;
//!
//! let backend = MockBackend::start().await;
//! backend
//!     .mount_get_sequence(
//!         "/api/session-requests/AB12/",
//!         vec![requests_ok(&["alice", "bob"]), requests_ok(&["bob"])],
//!     )
//!     .await;
//! ```

use common::secret::SecretString;
use lobby_client::client::{ActionClient, ActionClientConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// CSRF token every client built by [`MockBackend::client`] carries.
pub const TEST_CSRF_TOKEN: &str = "test-csrf-token";

/// Timestamp used for every canned `joined_at` / `created_at`.
pub const TEST_TIMESTAMP: &str = "2024-05-01T12:00:00Z";

pub const MY_INVITATIONS_PATH: &str = "/api/my-invitations/";
pub const RESPOND_INVITE_PATH: &str = "/api/respond-invite/";
pub const JOIN_WITH_CODE_PATH: &str = "/api/join-with-code/";
pub const HANDLE_REQUEST_PATH: &str = "/api/handle-request/";
pub const INVITE_PATH: &str = "/api/invite/";
pub const AVAILABLE_SESSIONS_PATH: &str = "/api/available-sessions/";

/// `/api/session-requests/{room_code}/`
pub fn session_requests_path(room_code: &str) -> String {
    format!("/api/session-requests/{room_code}/")
}

/// `/session/{room_code}/check-status/`
pub fn check_status_path(room_code: &str) -> String {
    format!("/session/{room_code}/check-status/")
}

/// `/session/{room_code}/toggle-discovery/`
pub fn toggle_discovery_path(room_code: &str) -> String {
    format!("/session/{room_code}/toggle-discovery/")
}

// =============================================================================
// Payload builders
// =============================================================================

/// `{status: "ok", invitations: [...]}` for `(session_id, room_code, host)` triples.
pub fn invitations_ok(invitations: &[(i64, &str, &str)]) -> Value {
    let invitations: Vec<Value> = invitations
        .iter()
        .map(|(id, room, host)| {
            json!({
                "session__id": id,
                "session__room_code": room,
                "session__host__username": host,
            })
        })
        .collect();
    json!({ "status": "ok", "invitations": invitations })
}

/// `{status: "ok", requests: [...]}` for the given usernames.
pub fn requests_ok(usernames: &[&str]) -> Value {
    let requests: Vec<Value> = usernames
        .iter()
        .map(|u| json!({ "user__username": u, "joined_at": TEST_TIMESTAMP }))
        .collect();
    json!({ "status": "ok", "requests": requests })
}

/// `{status: "ok", requests: [...]}` with a raw `joined_at` per username.
pub fn requests_with_joined_at(requests: &[(&str, Value)]) -> Value {
    let requests: Vec<Value> = requests
        .iter()
        .map(|(u, joined_at)| json!({ "user__username": u, "joined_at": joined_at }))
        .collect();
    json!({ "status": "ok", "requests": requests })
}

/// `{status: "ok", sessions: [...]}` for `(id, room_code, host)` triples.
pub fn sessions_ok(sessions: &[(i64, &str, &str)]) -> Value {
    let sessions: Vec<Value> = sessions
        .iter()
        .map(|(id, room, host)| {
            json!({
                "id": id,
                "room_code": room,
                "host__username": host,
                "max_participants": 10,
                "created_at": TEST_TIMESTAMP,
                "participant_count": 1,
            })
        })
        .collect();
    json!({ "status": "ok", "sessions": sessions })
}

/// Waiting-room status payload.
pub fn status_report(status: &str) -> Value {
    json!({ "status": status, "message": format!("Request {status}") })
}

/// `{status: "ok"}` with an optional message.
pub fn action_ok(message: Option<&str>) -> Value {
    match message {
        Some(message) => json!({ "status": "ok", "message": message }),
        None => json!({ "status": "ok" }),
    }
}

/// Backend logical error. `None` omits the `error` field.
pub fn action_error(error: Option<&str>) -> Value {
    match error {
        Some(error) => json!({ "status": "error", "error": error }),
        None => json!({ "status": "error" }),
    }
}

/// Successful visibility toggle.
pub fn visibility_ok(is_discoverable: bool) -> Value {
    let message = if is_discoverable {
        "Session is now discoverable"
    } else {
        "Session is now private"
    };
    json!({ "status": "ok", "is_discoverable": is_discoverable, "message": message })
}

// =============================================================================
// MockBackend
// =============================================================================

/// A client whose requests can never connect.
pub fn unreachable_client() -> ActionClient {
    ActionClient::new(ActionClientConfig::new(
        "http://127.0.0.1:1",
        SecretString::from(TEST_CSRF_TOKEN),
    ))
    .expect("client should build")
}

/// wiremock server standing in for the lobby backend.
pub struct MockBackend {
    server: MockServer,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// A client pointed at this backend with [`TEST_CSRF_TOKEN`].
    pub fn client(&self) -> ActionClient {
        ActionClient::new(ActionClientConfig::new(
            self.uri(),
            SecretString::from(TEST_CSRF_TOKEN),
        ))
        .expect("client should build")
    }

    /// Answer every `GET path` with `status` and `body`.
    pub async fn mount_get(&self, path_str: &str, status: u16, body: Value) {
        self.mount("GET", path_str, status, body, None).await;
    }

    /// Answer every `POST path` with `status` and `body`.
    pub async fn mount_post(&self, path_str: &str, status: u16, body: Value) {
        self.mount("POST", path_str, status, body, None).await;
    }

    /// Answer every `POST path` with `body` after `delay`.
    pub async fn mount_post_delayed(
        &self,
        path_str: &str,
        status: u16,
        body: Value,
        delay: Duration,
    ) {
        self.mount("POST", path_str, status, body, Some(delay)).await;
    }

    /// Answer `GET path` with each body in turn; the last one repeats.
    pub async fn mount_get_sequence(&self, path_str: &str, bodies: Vec<Value>) {
        let last = bodies.len().saturating_sub(1);
        for (i, body) in bodies.into_iter().enumerate() {
            let mock = Mock::given(method("GET"))
                .and(path(path_str))
                .respond_with(ResponseTemplate::new(200).set_body_json(body));
            let mock = if i < last { mock.up_to_n_times(1) } else { mock };
            mock.mount(&self.server).await;
        }
    }

    /// Reset every mount and recorded request.
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    async fn mount(
        &self,
        verb: &str,
        path_str: &str,
        status: u16,
        body: Value,
        delay: Option<Duration>,
    ) {
        let mut template = ResponseTemplate::new(status).set_body_json(body);
        if let Some(delay) = delay {
            template = template.set_delay(delay);
        }
        Mock::given(method(verb))
            .and(path(path_str))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Requests received for `verb path`, oldest first.
    pub async fn requests_to(&self, verb: &str, path_str: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == path_str)
            .collect()
    }

    /// Number of requests received for `verb path`.
    pub async fn count(&self, verb: &str, path_str: &str) -> usize {
        self.requests_to(verb, path_str).await.len()
    }

    /// Total number of requests received on any path.
    pub async fn total_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .len()
    }
}

/// Decode a form-encoded request body.
pub fn form_fields(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}
