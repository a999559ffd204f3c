//! Actix-web HTTP surface for the OIDC provider demo.
//!
//! Framework-specific code (handlers, actors, views, the interaction session cookie)
//! lives here. Domain types are in `oidc-core`; persistence sits behind `oidc-ports`.

pub mod actors;
pub mod handlers;
pub mod session;
pub mod views;

pub use views::Views;
