//! Irrigation alert entities.

pub mod model;
pub mod status;

pub use model::Alert;
pub use status::AlertStatus;
