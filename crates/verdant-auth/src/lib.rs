//! # verdant-auth
//!
//! JWT verification for the live-connection handshake. Tokens are issued
//! by the account service; this crate only checks them and extracts the
//! user identity.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
