//! Core types for entwine
//!
//! This crate holds the backend-agnostic half of the engine:
//!
//! - **Entity Registry** ([`schema`]): entity types, fields, relationship edges
//!   and their resolved cardinality/storage
//! - **Values** ([`value`]): semantic field types and values
//! - **Entities** ([`entity`]): materialized rows
//! - **Context** ([`context`]): cancellation and deadlines for store calls
//! - **Errors** ([`error`]): the engine's error taxonomy
//!
//! Query descriptors live in `entwine-query`; the SQLite store in
//! `entwine-sqlite`.

pub mod context;
pub mod entity;
pub mod error;
pub mod schema;
pub mod value;

// Re-exports
pub use context::Context;
pub use entity::Entity;
pub use error::{Error, Operation, Result};
pub use schema::{Edge, EntityType, Field, Registry};
pub use value::{FieldType, Value};
