//! Lobby client error types.
//!
//! Every variant is terminated locally by the component that hit it: turned
//! into a user-facing notification or a log line. Nothing here is fatal.

use thiserror::Error;

/// Lobby client error type.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// User input failed validation before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend answered but did not report `status: "ok"`.
    #[error("Rejected by backend: {}", .error.as_deref().unwrap_or("<no message>"))]
    Rejected {
        /// Server-supplied `error` text, when present and non-empty.
        error: Option<String>,
    },

    /// Request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body was not the JSON shape the endpoint documents.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The hosting page did not provide a required value.
    #[error("Missing page context: {0}")]
    MissingContext(&'static str),
}

impl LobbyError {
    /// Message to show the user for a failed action.
    ///
    /// Backend-reported errors use the server text when there is one and
    /// `rejected_fallback` otherwise. Transport and parse failures always use
    /// `transport_fallback`. The result is never empty.
    #[must_use]
    pub fn user_message(&self, rejected_fallback: &str, transport_fallback: &str) -> String {
        match self {
            LobbyError::Rejected { error: Some(msg) } => msg.clone(),
            LobbyError::Rejected { error: None } | LobbyError::MissingContext(_) => {
                rejected_fallback.to_string()
            }
            LobbyError::Validation(msg) => msg.clone(),
            LobbyError::Transport(_)
            | LobbyError::InvalidResponse(_)
            | LobbyError::Configuration(_) => transport_fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for LobbyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LobbyError::InvalidResponse(err.to_string())
        } else {
            LobbyError::Transport(err.to_string())
        }
    }
}

/// Trim `value`, rejecting blank input with `LobbyError::Validation(warning)`.
///
/// # Errors
///
/// Returns `LobbyError::Validation` when `value` is empty after trimming.
pub fn require_non_blank<'a>(value: &'a str, warning: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LobbyError::Validation(warning.to_string()))
    } else {
        Ok(trimmed)
    }
}

/// Result type alias using `LobbyError`
pub type Result<T> = std::result::Result<T, LobbyError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_uses_server_message() {
        let err = LobbyError::Rejected {
            error: Some("Session is full (10 max)".to_string()),
        };
        assert_eq!(
            err.user_message("Failed to join session", "Error joining session"),
            "Session is full (10 max)"
        );
    }

    #[test]
    fn test_rejected_without_message_uses_fallback() {
        let err = LobbyError::Rejected { error: None };
        assert_eq!(
            err.user_message("Failed to join session", "Error joining session"),
            "Failed to join session"
        );
        assert_eq!(err.to_string(), "Rejected by backend: <no message>");
    }

    #[test]
    fn test_transport_uses_transport_fallback() {
        let err = LobbyError::Transport("connection refused".to_string());
        assert_eq!(
            err.user_message("Failed to join session", "Error joining session"),
            "Error joining session"
        );

        let err = LobbyError::InvalidResponse("expected value".to_string());
        assert_eq!(err.user_message("a", "b"), "b");
    }

    #[test]
    fn test_missing_context_uses_rejected_fallback() {
        let err = LobbyError::MissingContext("session id");
        assert_eq!(err.user_message("Error handling request", "x"), "Error handling request");
    }

    #[test]
    fn test_require_non_blank() {
        assert_eq!(require_non_blank("  AB12 ", "w").unwrap(), "AB12");

        let err = require_non_blank("   ", "Please enter a room code").unwrap_err();
        assert!(matches!(err, LobbyError::Validation(_)));
        assert_eq!(err.user_message("a", "b"), "Please enter a room code");
    }
}
