//! Wire messages exchanged over live connections.

pub mod types;

pub use types::{AlertEventPayload, InboundMessage, OutboundMessage};
