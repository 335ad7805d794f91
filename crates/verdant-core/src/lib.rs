//! # verdant-core
//!
//! Core crate for Verdant irrigation alerts. Contains configuration
//! schemas, typed identifiers, the clock abstraction used by the
//! scheduler, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Verdant crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
