//! # Lobby Test Utilities
//!
//! Shared test utilities for the lobby client.
//!
//! This crate provides:
//! - `mock_backend` - wiremock-backed lobby backend with canned payloads
//! - `recorders` - `NotificationSink` / `Navigator` doubles that record calls
//! - `page` - fixed `PageContext` for host components
//! - `eventual` - polling assertion for effects that land on spawned tasks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lobby_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let backend = MockBackend::start().await;
//!     backend
//!         .mount_get("/api/my-invitations/", 200, invitations_ok(&[(7, "AB12", "alice")]))
//!         .await;
//!
//!     let notifier = RecordingNotifier::new();
//!     let navigator = RecordingNavigator::new();
//!     let sync = InvitationSync::new(backend.client(), notifier.clone(), navigator.clone());
//!
//!     sync.poll_once().await.unwrap();
//!     assert!(sync.prompt().is_some());
//! }
//! ```

pub mod eventual;
pub mod mock_backend;
pub mod page;
pub mod recorders;

// Re-export commonly used items
pub use eventual::*;
pub use mock_backend::*;
pub use page::*;
pub use recorders::*;
