//! Request and response bodies.

pub mod response;
