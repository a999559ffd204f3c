//! Framework-agnostic domain types for the OIDC provider demo.
//!
//! Everything persisted through an adapter, and everything the interaction
//! handlers exchange with the provider, is defined here.

pub mod account;
pub mod error;
pub mod interaction;
pub mod model;
pub mod payload;

pub use account::*;
pub use error::*;
pub use interaction::*;
pub use model::*;
pub use payload::*;

/// Current time as whole seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}
