//! HTTP action client for the session backend.
//!
//! Wraps every endpoint the lobby flows need: the three list reads polled by
//! [`crate::invitations`], [`crate::requests`] and [`crate::waiting`], and the
//! fire-and-forget state-changing calls (invite, respond, approve/reject,
//! join by code, toggle discoverability).
//!
//! # Response normalization
//!
//! The backend answers logical failures with a non-2xx HTTP status and a JSON
//! body such as `{"error": "Session is full (10 max)"}`. The client therefore
//! parses the body regardless of HTTP status and only treats a call as
//! successful when the body reports `status: "ok"`. Everything else becomes
//! [`LobbyError::Rejected`], carrying the server's `error` text when it is
//! present and non-empty.
//!
//! # Security
//!
//! - The anti-forgery token is injected at construction as a `SecretString`
//!   and sent as both the `X-CSRFToken` header and the `csrfmiddlewaretoken`
//!   form field on every POST.
//! - Token and session cookie never appear in Debug output or logs.

use crate::errors::{LobbyError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::{Decision, ParticipantStatus, SessionId};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, instrument, warn};

// =============================================================================
// Constants
// =============================================================================

/// Request marker header the backend uses to recognise script calls.
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";

/// Value of [`REQUESTED_WITH_HEADER`].
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// Header carrying the anti-forgery token on state-changing calls.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Form field carrying the anti-forgery token.
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";

/// Status discriminator value for a successful call.
const STATUS_OK: &str = "ok";

/// Offset-less layouts the backend emits when its timezone support is off.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// =============================================================================
// Wire Types
// =============================================================================

/// A pending invitation addressed to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Invitation {
    /// Session the user is invited to.
    #[serde(rename = "session__id")]
    pub session_id: SessionId,

    /// Human-enterable code of that session.
    #[serde(rename = "session__room_code")]
    pub room_code: String,

    /// Username of the inviting host.
    #[serde(rename = "session__host__username")]
    pub host_username: String,
}

/// A pending request to join the host's room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRequest {
    /// Requesting user.
    #[serde(rename = "user__username")]
    pub username: String,

    /// When the request was made. `None` when the backend's value could
    /// not be read as a timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub joined_at: Option<DateTime<Utc>>,
}

/// A discoverable session the current user could join.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AvailableSession {
    pub id: SessionId,
    pub room_code: String,
    #[serde(rename = "host__username")]
    pub host_username: String,
    pub max_participants: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participant_count: u32,
}

/// Current user's membership state in a room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusReport {
    pub status: ParticipantStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a successful toggle of session discoverability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    pub is_discoverable: bool,
    pub message: Option<String>,
}

/// Successful state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionSuccess {
    /// Server-supplied confirmation text, if any.
    pub message: Option<String>,
}

/// Result of one state-changing call. Consumed once by the caller to drive a
/// notification and any follow-up navigation.
pub type ActionResult = Result<ActionSuccess>;

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    is_discoverable: Option<bool>,
}

impl ActionEnvelope {
    fn into_result(self) -> Result<Self> {
        if self.status.as_deref() == Some(STATUS_OK) {
            Ok(self)
        } else {
            Err(rejected(self.error))
        }
    }
}

#[derive(Debug, Deserialize)]
struct InvitationsEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    invitations: Vec<Invitation>,
}

#[derive(Debug, Deserialize)]
struct RequestsEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    requests: Vec<JoinRequest>,
}

#[derive(Debug, Deserialize)]
struct SessionsEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    sessions: Vec<AvailableSession>,
}

fn rejected(error: Option<String>) -> LobbyError {
    LobbyError::Rejected {
        error: error.filter(|e| !e.trim().is_empty()),
    }
}

fn ensure_ok(status: Option<&str>, error: Option<String>) -> Result<()> {
    if status == Some(STATUS_OK) {
        Ok(())
    } else {
        Err(rejected(error))
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the action client.
#[derive(Clone)]
pub struct ActionClientConfig {
    /// Backend origin (e.g., `http://localhost:8000`).
    pub base_url: String,

    /// Anti-forgery token supplied by the hosting page.
    pub csrf_token: SecretString,

    /// Backend session cookie value, when the host is not a browser.
    pub session_cookie: Option<SecretString>,

    /// Request timeout. `None` leaves transport defaults in place.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ActionClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionClientConfig")
            .field("base_url", &self.base_url)
            .field("csrf_token", &"[REDACTED]")
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ActionClientConfig {
    /// Create a configuration with no session cookie and no timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, csrf_token: SecretString) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token,
            session_cookie: None,
            timeout: None,
        }
    }

    /// Set the backend session cookie.
    #[must_use]
    pub fn with_session_cookie(mut self, cookie: SecretString) -> Self {
        self.session_cookie = Some(cookie);
        self
    }

    /// Set a request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and the offset-less forms in [`NAIVE_TIMESTAMP_FORMATS`],
/// which are read as UTC. Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// A timestamp field that never fails the enclosing payload.
fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(parse_timestamp);
    if let (None, Some(raw)) = (parsed, &raw) {
        debug!(target: "lobby.client", value = %raw, "Unreadable timestamp, leaving it unset");
    }
    Ok(parsed)
}

// =============================================================================
// Client
// =============================================================================

/// Client for the session backend's lobby endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ActionClient {
    base_url: reqwest::Url,
    csrf_token: SecretString,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for ActionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionClient")
            .field("base_url", &self.base_url.as_str())
            .field("csrf_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ActionClient {
    /// Build a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::Configuration` if the base URL cannot carry paths,
    /// the token or cookie cannot be used as a header value, or the HTTP
    /// client cannot be built.
    pub fn new(config: ActionClientConfig) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                LobbyError::Configuration(format!("Invalid base URL: {}", config.base_url))
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            REQUESTED_WITH_HEADER,
            HeaderValue::from_static(REQUESTED_WITH_VALUE),
        );

        let mut cookie = format!("csrftoken={}", config.csrf_token.expose_secret());
        if let Some(session) = &config.session_cookie {
            cookie.push_str("; sessionid=");
            cookie.push_str(session.expose_secret());
        }
        let mut cookie = HeaderValue::from_str(&cookie).map_err(|_| {
            LobbyError::Configuration("Token or session cookie is not a valid header value".into())
        })?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| LobbyError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            csrf_token: config.csrf_token,
            http_client,
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// List invitations pending for the current user.
    ///
    /// `GET /api/my-invitations/`
    #[instrument(skip_all)]
    pub async fn my_invitations(&self) -> Result<Vec<Invitation>> {
        let envelope: InvitationsEnvelope = self.get_json(&["api", "my-invitations"]).await?;
        ensure_ok(envelope.status.as_deref(), envelope.error)?;
        Ok(envelope.invitations)
    }

    /// List pending join requests for a room the current user hosts.
    ///
    /// `GET /api/session-requests/{room_code}/`
    #[instrument(skip_all, fields(room_code = %room_code))]
    pub async fn session_requests(&self, room_code: &str) -> Result<Vec<JoinRequest>> {
        let envelope: RequestsEnvelope = self
            .get_json(&["api", "session-requests", room_code.trim()])
            .await?;
        ensure_ok(envelope.status.as_deref(), envelope.error)?;
        Ok(envelope.requests)
    }

    /// List discoverable sessions the current user is not part of.
    ///
    /// `GET /api/available-sessions/`
    #[instrument(skip_all)]
    pub async fn available_sessions(&self) -> Result<Vec<AvailableSession>> {
        let envelope: SessionsEnvelope = self.get_json(&["api", "available-sessions"]).await?;
        ensure_ok(envelope.status.as_deref(), envelope.error)?;
        Ok(envelope.sessions)
    }

    /// Current user's membership state in a room.
    ///
    /// `GET /session/{room_code}/check-status/`
    #[instrument(skip_all, fields(room_code = %room_code))]
    pub async fn check_status(&self, room_code: &str) -> Result<StatusReport> {
        self.get_json(&["session", room_code.trim(), "check-status"])
            .await
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Accept or reject an invitation.
    ///
    /// `POST /api/respond-invite/` with `session_id`, `action`
    #[instrument(skip_all, fields(session_id = %session_id, action = %decision))]
    pub async fn respond_invite(&self, session_id: SessionId, decision: Decision) -> ActionResult {
        let session_id = session_id.to_string();
        self.post_action(
            &["api", "respond-invite"],
            &[("session_id", &session_id), ("action", decision.as_str())],
        )
        .await
    }

    /// Ask to join a session by its room code.
    ///
    /// `POST /api/join-with-code/` with `room_code`
    #[instrument(skip_all)]
    pub async fn join_with_code(&self, room_code: &str) -> ActionResult {
        self.post_action(
            &["api", "join-with-code"],
            &[("room_code", room_code.trim())],
        )
        .await
    }

    /// Approve or reject a pending join request.
    ///
    /// `POST /api/handle-request/` with `username`, `session_id`, `action`
    #[instrument(skip_all, fields(username = %username, action = %decision))]
    pub async fn handle_request(
        &self,
        username: &str,
        session_id: SessionId,
        decision: Decision,
    ) -> ActionResult {
        let session_id = session_id.to_string();
        self.post_action(
            &["api", "handle-request"],
            &[
                ("username", username),
                ("session_id", &session_id),
                ("action", decision.as_str()),
            ],
        )
        .await
    }

    /// Invite a user into the host's session.
    ///
    /// `POST /api/invite/` with `username`, `session_id`
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn invite(&self, username: &str, session_id: SessionId) -> ActionResult {
        let session_id = session_id.to_string();
        self.post_action(
            &["api", "invite"],
            &[("username", username.trim()), ("session_id", &session_id)],
        )
        .await
    }

    /// Flip whether a room is listed in available sessions.
    ///
    /// `POST /session/{room_code}/toggle-discovery/`
    #[instrument(skip_all, fields(room_code = %room_code))]
    pub async fn toggle_discoverability(&self, room_code: &str) -> Result<Visibility> {
        let envelope = self
            .post_envelope(&["session", room_code.trim(), "toggle-discovery"], &[])
            .await?;
        Ok(Visibility {
            is_discoverable: envelope.is_discoverable.unwrap_or(false),
            message: envelope.message,
        })
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    /// Join `segments` onto the base URL with a trailing slash. Each segment
    /// is percent-encoded, so a room code cannot add path levels or a query.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| LobbyError::Configuration("Base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(target: "lobby.client", url = %url, "GET");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            debug!(target: "lobby.client", error = %e, "HTTP request failed");
            LobbyError::from(e)
        })?;

        read_json(response).await
    }

    async fn post_action(&self, segments: &[&str], fields: &[(&str, &str)]) -> ActionResult {
        let envelope = self.post_envelope(segments, fields).await?;
        Ok(ActionSuccess {
            message: envelope.message,
        })
    }

    async fn post_envelope(
        &self,
        segments: &[&str],
        fields: &[(&str, &str)],
    ) -> Result<ActionEnvelope> {
        let url = self.endpoint(segments)?;
        debug!(target: "lobby.client", url = %url, "POST");

        let mut form: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 1);
        form.extend_from_slice(fields);
        form.push((CSRF_FORM_FIELD, self.csrf_token.expose_secret()));

        let response = self
            .http_client
            .post(url.clone())
            .header(CSRF_HEADER, self.csrf_token.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "lobby.client", error = %e, "HTTP request failed");
                LobbyError::from(e)
            })?;

        let envelope: ActionEnvelope = read_json(response).await?;
        envelope.into_result().inspect_err(|e| {
            debug!(target: "lobby.client", url = %url, error = %e, "Backend rejected action");
        })
    }
}

/// Parse a response body as JSON, whatever its HTTP status.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    serde_json::from_str(&body).map_err(|e| {
        warn!(
            target: "lobby.client",
            http_status = %status,
            error = %e,
            "Response body is not the expected JSON"
        );
        LobbyError::InvalidResponse(format!("HTTP {status}: {e}"))
    })
}

// =============================================================================
// Tests
// =============================================================================
