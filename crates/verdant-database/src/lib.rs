//! # verdant-database
//!
//! Collaborator interfaces consumed by the alert engine (alert repository
//! and notification mailbox), their PostgreSQL implementations, and an
//! in-memory implementation for development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use provider::StoreHandles;
pub use store::{AlertRepository, NotificationMailbox};
