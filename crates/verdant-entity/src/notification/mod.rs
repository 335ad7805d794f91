//! Mailbox notification entities.

pub mod category;
pub mod model;

pub use category::NotificationCategory;
pub use model::Notification;
