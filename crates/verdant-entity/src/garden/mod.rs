//! Garden membership value objects.

pub mod recipient;

pub use recipient::{Recipient, RecipientRole};
