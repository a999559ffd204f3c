//! Integration ports for the OIDC provider demo.
//!
//! Implement these traits to plug in another store or a real account
//! directory without touching the HTTP layer.

pub mod accounts;
pub mod adapter;

pub use accounts::*;
pub use adapter::*;
