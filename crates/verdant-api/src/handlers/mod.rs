//! Request handlers.

pub mod health;
pub mod presence;
pub mod stats;
pub mod ws;
