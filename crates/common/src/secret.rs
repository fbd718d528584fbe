//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use them for the
//! anti-forgery token and the backend session cookie, which both grant the
//! holder the ability to act as the signed-in user.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` around one stays safe to hand to `tracing`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct PageCredentials {
//!     username: String,
//!     csrf_token: SecretString,
//! }
//!
//! let creds = PageCredentials {
//!     username: "alice".to_string(),
//!     csrf_token: SecretString::from("f00dcafe"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("f00dcafe"));
//! assert_eq!(creds.csrf_token.expose_secret(), "f00dcafe");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
