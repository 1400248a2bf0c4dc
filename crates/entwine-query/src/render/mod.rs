//! Target renderers for query descriptors.
//!
//! Renderers convert a validated [`QueryDescriptor`] into a target-specific
//! statement plus named parameters.

mod sqlite;

pub use sqlite::{quote, SqliteRenderer};

use crate::ir::QueryDescriptor;
use entwine_core::schema::Column;
use entwine_core::{Result, Value};
use std::collections::HashMap;

/// What the rendered statement returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Full rows of the final type, in [`RenderedQuery::columns`] order
    Entities,
    /// Distinct ids of the final type
    Ids,
    /// Number of distinct matches
    Count,
    /// A single 0/1 row
    Exists,
}

/// Output from rendering
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    /// The generated statement
    pub sql: String,
    /// Parameters to bind, by name without the leading `:`
    pub params: HashMap<String, Value>,
    /// Type of the returned rows
    pub entity: String,
    /// Selected columns for [`Selection::Entities`], empty otherwise
    pub columns: Vec<Column>,
}

/// Trait for rendering descriptors to a target query language.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Render the descriptor to a statement with parameters
    fn render(&self, ir: &QueryDescriptor, selection: Selection) -> Result<RenderedQuery>;
}
