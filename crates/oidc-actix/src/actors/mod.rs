pub mod interaction_actor;

pub use interaction_actor::*;
