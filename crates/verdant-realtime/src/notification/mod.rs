//! Alert notification composition and fan-out.

pub mod dispatcher;
pub mod formatter;
