//! # verdant-worker
//!
//! Time-driven side of the alert engine: the serialized scheduler tick
//! with its reminder and due-time scans, the notifier used by alert
//! create/cancel use cases, and cron-driven maintenance jobs.

pub mod jobs;
pub mod maintenance;
pub mod notifier;
pub mod scheduler;

pub use maintenance::MaintenanceScheduler;
pub use notifier::AlertNotifier;
pub use scheduler::{AlertScheduler, TickReport};
