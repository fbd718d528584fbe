//! Lobby client configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use crate::client::ActionClientConfig;
use crate::page::PageLocation;
use common::config::ObservabilityConfig;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default poll interval for invitation, request and status loops.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default time a notification stays fully visible.
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 4000;

/// Default delay before a reload or redirect after a successful action.
pub const DEFAULT_NAVIGATION_DELAY_MS: u64 = 1500;

/// Which side of the workflow the terminal front end runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Receives invitations and joins by room code.
    Participant,
    /// Reviews join requests for the room in `LOBBY_PAGE_PATH`.
    Host,
    /// Waits for the host's answer to a join request.
    Waiting,
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "participant" => Ok(Role::Participant),
            "host" => Ok(Role::Host),
            "waiting" => Ok(Role::Waiting),
            other => Err(ConfigError::InvalidValue(format!(
                "LOBBY_ROLE must be participant, host or waiting (got {other:?})"
            ))),
        }
    }
}

/// Lobby client configuration.
#[derive(Clone)]
pub struct Config {
    /// Backend origin, without trailing slash (e.g., `https://meet.example.com`).
    pub base_url: String,

    /// Anti-forgery token for state-changing calls.
    pub csrf_token: SecretString,

    /// Backend session cookie identifying the signed-in user.
    pub session_cookie: Option<SecretString>,

    /// Interval between poll ticks.
    pub poll_interval: Duration,

    /// How long a notification stays fully visible.
    pub notification_ttl: Duration,

    /// Delay before a scheduled reload or redirect.
    pub navigation_delay: Duration,

    /// Optional request timeout; transport defaults apply when unset.
    pub http_timeout: Option<Duration>,

    /// Role run by the terminal front end.
    pub role: Role,

    /// Path of the page this client stands in for (room code source).
    pub page_path: String,

    /// Session id of the host's session, when acting as host.
    pub session_id: Option<String>,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("csrf_token", &"[REDACTED]")
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .field("poll_interval", &self.poll_interval)
            .field("notification_ttl", &self.notification_ttl)
            .field("navigation_delay", &self.navigation_delay)
            .field("http_timeout", &self.http_timeout)
            .field("role", &self.role)
            .field("page_path", &self.page_path)
            .field("session_id", &self.session_id)
            .field("observability", &self.observability)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let base_url = vars
            .get("LOBBY_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("LOBBY_BASE_URL".to_string()))?
            .trim()
            .trim_end_matches('/')
            .to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "LOBBY_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let csrf_token = SecretString::from(
            vars.get("LOBBY_CSRF_TOKEN")
                .ok_or_else(|| ConfigError::MissingEnvVar("LOBBY_CSRF_TOKEN".to_string()))?
                .clone(),
        );

        let session_cookie = vars
            .get("LOBBY_SESSION_COOKIE")
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::from(s.clone()));

        let poll_interval = Duration::from_millis(parse_millis(
            vars,
            "LOBBY_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
        )?);
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "LOBBY_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let notification_ttl = Duration::from_millis(parse_millis(
            vars,
            "LOBBY_NOTIFICATION_TTL_MS",
            DEFAULT_NOTIFICATION_TTL_MS,
        )?);

        let navigation_delay = Duration::from_millis(parse_millis(
            vars,
            "LOBBY_NAVIGATION_DELAY_MS",
            DEFAULT_NAVIGATION_DELAY_MS,
        )?);

        let http_timeout = match vars.get("LOBBY_HTTP_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("LOBBY_HTTP_TIMEOUT_MS is not a number: {raw}"))
            })?)),
            None => None,
        };

        let role = match vars.get("LOBBY_ROLE") {
            Some(raw) => raw.parse()?,
            None => Role::Participant,
        };

        let page_path = vars
            .get("LOBBY_PAGE_PATH")
            .cloned()
            .unwrap_or_else(|| "/".to_string());

        let session_id = vars
            .get("LOBBY_SESSION_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Config {
            base_url,
            csrf_token,
            session_cookie,
            poll_interval,
            notification_ttl,
            navigation_delay,
            http_timeout,
            role,
            page_path,
            session_id,
            observability: ObservabilityConfig::from_vars(vars),
        })
    }
}

impl Config {
    /// Client settings derived from this configuration.
    #[must_use]
    pub fn client_config(&self) -> ActionClientConfig {
        let mut client = ActionClientConfig::new(self.base_url.clone(), self.csrf_token.clone());
        if let Some(cookie) = &self.session_cookie {
            client = client.with_session_cookie(cookie.clone());
        }
        if let Some(timeout) = self.http_timeout {
            client = client.with_timeout(timeout);
        }
        client
    }

    /// Page context for the configured path and session id.
    #[must_use]
    pub fn page(&self) -> PageLocation {
        let page = PageLocation::new(self.page_path.clone());
        match &self.session_id {
            Some(id) => page.with_session_id(id.clone()),
            None => page,
        }
    }
}

fn parse_millis(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key} is not a number: {raw}"))),
        None => Ok(default),
    }
}
