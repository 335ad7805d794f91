//! # verdant-realtime
//!
//! Live side of the alert engine:
//!
//! - Presence registry mapping each user to their single live connection
//! - Connection lifecycle (best-effort authentication, heartbeat, replacement)
//! - Presence-aware alert dispatch (mailbox write plus live push)
//! - Engine metrics

pub mod connection;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod presence;
pub mod server;

pub use connection::lifecycle::ConnectionLifecycleManager;
pub use notification::dispatcher::{AlertDispatcher, DispatchReport};
pub use presence::registry::PresenceRegistry;
pub use server::RealtimeEngine;
