//! Live connection management.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod lifecycle;
pub mod pool;
