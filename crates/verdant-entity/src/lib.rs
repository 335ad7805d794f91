//! # verdant-entity
//!
//! Domain entity models for Verdant. Every struct in this crate represents
//! a database table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and database entities
//! additionally derive `sqlx::FromRow`.

mod text_enum;

pub mod alert;
pub mod garden;
pub mod notification;
