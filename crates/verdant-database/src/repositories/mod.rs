//! PostgreSQL implementations of the persistence contracts.

pub mod alert;
pub mod notification;

pub use alert::PgAlertRepository;
pub use notification::PgNotificationMailbox;
