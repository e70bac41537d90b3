//! `depotwatch-core`: shared domain building blocks.
//!
//! Identifiers, the entity trait and the domain error model. No IO, no
//! infrastructure concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::OrderId;
