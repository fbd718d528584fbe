//! Capabilities supplied by the hosting page.
//!
//! The lobby components never look up ambient state. The host injects:
//! - a [`PageContext`] answering "which room / which session is this page for",
//! - a [`Navigator`] that performs reloads and redirects,
//! - optionally a [`TextInput`] bound to the invite form.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Room code is the path segment following `/session/`, up to any query or
/// fragment.
static ROOM_CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/session/([^/?#]+)").ok());

/// Extract the room code from a page path such as `/session/48213377/control/`.
#[must_use]
pub fn room_code_from_path(path: &str) -> Option<String> {
    ROOM_CODE_PATTERN
        .as_ref()?
        .captures(path)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Page-level identity the host components act on.
pub trait PageContext: Send + Sync {
    /// Room code of the session this page shows, if any.
    fn current_room_code(&self) -> Option<String>;

    /// Session id of the session this page shows, if any.
    fn current_session_id(&self) -> Option<String>;
}

/// [`PageContext`] backed by a fixed path and session id.
#[derive(Debug, Clone, Default)]
pub struct PageLocation {
    path: String,
    session_id: Option<String>,
}

impl PageLocation {
    /// Create a location for `path` with no session id.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: None,
        }
    }

    /// Attach the session id the page carries.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

impl PageContext for PageLocation {
    fn current_room_code(&self) -> Option<String> {
        room_code_from_path(&self.path)
    }

    fn current_session_id(&self) -> Option<String> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Navigation
// =============================================================================

/// A page transition requested after a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Reload the current page.
    Reload,
    /// Go to a path on the backend origin.
    To(String),
}

impl Navigation {
    /// Waiting room of a room the user asked to join.
    #[must_use]
    pub fn waiting_room(room_code: &str) -> Self {
        Navigation::To(format!("/session/{room_code}/waiting/"))
    }

    /// The session room itself.
    #[must_use]
    pub fn session_room(room_code: &str) -> Self {
        Navigation::To(format!("/session/{room_code}/"))
    }

    /// Landing page.
    #[must_use]
    pub fn home() -> Self {
        Navigation::To("/".to_string())
    }
}

/// Performs page transitions.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: Navigation);
}

/// Run `target` on `navigator` once, after `delay`.
///
/// Returns `None` when called outside a Tokio runtime; the navigation is
/// dropped in that case.
pub fn schedule_navigation(
    navigator: &Arc<dyn Navigator>,
    target: Navigation,
    delay: Duration,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(target: "lobby.page", target_page = ?target, "No async runtime, navigation dropped");
        return None;
    };

    let navigator = Arc::clone(navigator);
    Some(runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        debug!(target: "lobby.page", target_page = ?target, "Navigating");
        navigator.navigate(target);
    }))
}

// =============================================================================
// Input
// =============================================================================

/// A single-line text input owned by the page.
#[derive(Debug, Clone)]
pub struct TextInput {
    value: Arc<watch::Sender<String>>,
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl TextInput {
    #[must_use]
    pub fn new() -> Self {
        let (value, _) = watch::channel(String::new());
        Self {
            value: Arc::new(value),
        }
    }

    pub fn set(&self, value: impl Into<String>) {
        self.value.send_replace(value.into());
    }

    #[must_use]
    pub fn value(&self) -> String {
        self.value.borrow().clone()
    }

    pub fn clear(&self) {
        self.value.send_if_modified(|v| {
            if v.is_empty() {
                false
            } else {
                v.clear();
                true
            }
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.value.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_from_path() {
        assert_eq!(
            room_code_from_path("/session/48213377/").as_deref(),
            Some("48213377")
        );
        assert_eq!(
            room_code_from_path("/session/AB12/control/").as_deref(),
            Some("AB12")
        );
        assert_eq!(room_code_from_path("/session/AB12").as_deref(), Some("AB12"));
        assert_eq!(room_code_from_path("/profile/"), None);
        assert_eq!(room_code_from_path("/session/"), None);
    }

    #[test]
    fn test_room_code_stops_at_query_and_fragment() {
        assert_eq!(
            room_code_from_path("/session/AB12?tab=1").as_deref(),
            Some("AB12")
        );
        assert_eq!(
            room_code_from_path("/session/AB12#requests").as_deref(),
            Some("AB12")
        );
        assert_eq!(
            room_code_from_path("/session/AB12/?next=/session/ZZ99/").as_deref(),
            Some("AB12")
        );
        assert_eq!(room_code_from_path("/session/?tab=1"), None);

        let page = PageLocation::new("/session/48213377?joined=1");
        assert_eq!(page.current_room_code().as_deref(), Some("48213377"));
    }

    #[test]
    fn test_page_location_context() {
        let page = PageLocation::new("/session/AB12/control/").with_session_id(" 7 ");
        assert_eq!(page.current_room_code().as_deref(), Some("AB12"));
        assert_eq!(page.current_session_id().as_deref(), Some("7"));

        let page = PageLocation::new("/").with_session_id("   ");
        assert_eq!(page.current_room_code(), None);
        assert_eq!(page.current_session_id(), None);
    }

    #[test]
    fn test_navigation_destinations() {
        assert_eq!(
            Navigation::waiting_room("AB12"),
            Navigation::To("/session/AB12/waiting/".to_string())
        );
        assert_eq!(
            Navigation::session_room("AB12"),
            Navigation::To("/session/AB12/".to_string())
        );
        assert_eq!(Navigation::home(), Navigation::To("/".to_string()));
    }

    #[test]
    fn test_text_input_clear() {
        let input = TextInput::new();
        let rx = input.subscribe();
        input.set("bob");
        assert_eq!(input.value(), "bob");
        input.clear();
        assert_eq!(input.value(), "");
        assert_eq!(*rx.borrow(), "");
    }

    #[test]
    fn test_schedule_navigation_outside_runtime() {
        struct Nothing;
        impl Navigator for Nothing {
            fn navigate(&self, _target: Navigation) {}
        }
        let navigator: Arc<dyn Navigator> = Arc::new(Nothing);
        assert!(schedule_navigation(&navigator, Navigation::Reload, Duration::ZERO).is_none());
    }
}
