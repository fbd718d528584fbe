//! Fixed page context for host-side tests.

use lobby_client::page::PageContext;
use std::sync::{Arc, Mutex};

/// [`PageContext`] whose answers the test controls.
#[derive(Debug, Default)]
pub struct StaticPage {
    room_code: Mutex<Option<String>>,
    session_id: Mutex<Option<String>>,
}

impl StaticPage {
    /// A host page for `room_code` / `session_id`.
    pub fn host(room_code: &str, session_id: i64) -> Arc<Self> {
        Arc::new(Self {
            room_code: Mutex::new(Some(room_code.to_string())),
            session_id: Mutex::new(Some(session_id.to_string())),
        })
    }

    /// A page with neither room code nor session id.
    pub fn blank() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_session_id(&self, session_id: Option<&str>) {
        *self.session_id.lock().unwrap() = session_id.map(str::to_string);
    }
}

impl PageContext for StaticPage {
    fn current_room_code(&self) -> Option<String> {
        self.room_code.lock().unwrap().clone()
    }

    fn current_session_id(&self) -> Option<String> {
        self.session_id.lock().unwrap().clone()
    }
}
