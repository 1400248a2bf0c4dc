//! Descriptor transforms applied before rendering.

mod validate;

pub use validate::ValidateTransform;

use crate::ir::QueryDescriptor;
use entwine_core::Result;

/// A pass over a query descriptor.
pub trait QueryTransform {
    /// Name for logging
    fn name(&self) -> &'static str;

    fn transform(&self, ir: QueryDescriptor) -> Result<QueryDescriptor>;
}
