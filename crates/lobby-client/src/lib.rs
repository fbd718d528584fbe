//! Lobby Client Library
//!
//! Client-side coordination for the session lobby: invitations, join
//! requests, the participant waiting room and the session directory. Each
//! component polls one backend list endpoint, projects the result into
//! observable UI state, and turns user choices into action requests.
//!
//! # Architecture
//!
//! ```text
//! host page (browser shell, TUI, tests)
//! ├── PageContext / Navigator / TextInput   capabilities injected by the host
//! ├── NotificationCenter                    auto-dismissing feedback stack
//! └── components
//!     ├── InvitationSync    participant: pending invitations, join by code
//!     ├── RequestBoard      host: join requests, invites, visibility
//!     ├── WaitingRoom       participant: own join-request status
//!     └── SessionDirectory  participant: discoverable sessions
//!             │
//!             └── ActionClient ── HTTP ──> lobby backend
//! ```
//!
//! Every poll loop is owned by a [`poll::PollHandle`]; dropping or cancelling
//! the handle stops the loop. UI state is held in `tokio::sync::watch`
//! channels so the host can render the latest value or await changes.
//!
//! # Modules
//!
//! - [`client`] - Action client and wire types
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error type and user-facing message mapping
//! - [`notify`] - Notification sink and auto-dismissing center
//! - [`page`] - Host capabilities
//! - [`poll`] - Cancellable poll loop

#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod directory;
pub mod errors;
pub mod invitations;
pub mod notify;
pub mod page;
pub mod poll;
pub mod requests;
pub mod waiting;

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::warn;

/// Spawn `fut` on the current runtime, if there is one.
pub(crate) fn spawn_detached<F>(fut: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => Some(runtime.spawn(fut)),
        Err(_) => {
            warn!(target: "lobby", "No async runtime, action dropped");
            None
        }
    }
}
