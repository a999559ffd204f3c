//! The provider boundary the interaction UI talks to.
//!
//! [`Provider`] is built once at startup and shared with the HTTP layer; there is
//! no process-wide provider state.

pub mod accounts;
pub mod provider;

pub use accounts::DemoAccounts;
pub use provider::Provider;
