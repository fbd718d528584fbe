//! Common configuration types for Lobby components.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default log filter when neither `RUST_LOG` nor `LOBBY_LOG_LEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Read `LOBBY_LOG_LEVEL` and `LOBBY_JSON_LOGS` from a variable map.
    ///
    /// Unset or unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let log_level = vars
            .get("LOBBY_LOG_LEVEL")
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let json_logs = vars
            .get("LOBBY_JSON_LOGS")
            .is_some_and(|s| matches!(s.trim(), "1" | "true" | "TRUE" | "yes"));

        Self {
            log_level,
            json_logs,
        }
    }
}
