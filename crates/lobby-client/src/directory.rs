//! Discoverable session directory.

use crate::client::{ActionClient, AvailableSession};
use crate::errors::Result;
use crate::invitations::InvitationSync;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Lists sessions whose hosts made them discoverable.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    client: ActionClient,
    joiner: InvitationSync,
    sessions: Arc<watch::Sender<Vec<AvailableSession>>>,
}

impl SessionDirectory {
    /// `joiner` performs the join-by-code flow for [`SessionDirectory::join`].
    #[must_use]
    pub fn new(client: ActionClient, joiner: InvitationSync) -> Self {
        let (sessions, _) = watch::channel(Vec::new());
        Self {
            client,
            joiner,
            sessions: Arc::new(sessions),
        }
    }

    /// Fetch the directory and publish the full list.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the published list is left unchanged.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<Vec<AvailableSession>> {
        let sessions = self.client.available_sessions().await?;
        debug!(target: "lobby.directory", count = sessions.len(), "Fetched available sessions");
        self.sessions.send_replace(sessions.clone());
        Ok(sessions)
    }

    /// Last published list.
    #[must_use]
    pub fn sessions(&self) -> Vec<AvailableSession> {
        self.sessions.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<AvailableSession>> {
        self.sessions.subscribe()
    }

    /// Ask to join a listed session.
    pub async fn join(&self, entry: &AvailableSession) {
        self.joiner.join_with_code(&entry.room_code).await;
    }
}
