//! Who is reachable right now.

pub mod registry;

pub use registry::{PresenceRegistry, PresenceSummary};
