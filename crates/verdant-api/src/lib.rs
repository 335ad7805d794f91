//! # verdant-api
//!
//! HTTP surface for the Verdant alert engine built on Axum.
//!
//! Provides the WebSocket upgrade that feeds the connection lifecycle
//! manager, the presence dashboard, stats and health endpoints, and the
//! mapping from `AppError` to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use app::{build_app, serve};
pub use state::AppState;
