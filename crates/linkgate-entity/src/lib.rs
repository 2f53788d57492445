//! # linkgate-entity
//!
//! Domain entity models for LinkGate. Every struct in this crate
//! represents a persisted record or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and records read
//! straight from PostgreSQL additionally derive `sqlx::FromRow`.

pub mod attempt;
pub mod audit;
pub mod permission;
pub mod resource;
