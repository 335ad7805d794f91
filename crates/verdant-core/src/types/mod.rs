//! Core type definitions used across the Verdant workspace.

pub mod id;

pub use id::*;
