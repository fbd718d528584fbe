//! Recording doubles for the capabilities components call out to.

use lobby_client::notify::{NotificationLevel, NotificationSink};
use lobby_client::page::{Navigation, Navigator};
use std::sync::{Arc, Mutex};

/// Records every notification instead of displaying it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All notifications, oldest first.
    pub fn all(&self) -> Vec<(NotificationLevel, String)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    /// Messages recorded at `level`.
    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// The most recent notification.
    pub fn last(&self) -> Option<(NotificationLevel, String)> {
        self.notes.lock().unwrap().last().cloned()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: String) {
        self.notes.lock().unwrap().push((level, message));
    }
}

/// Records navigations instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    navigations: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Navigation> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.navigations.lock().unwrap().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: Navigation) {
        self.navigations.lock().unwrap().push(target);
    }
}
