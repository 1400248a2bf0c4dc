//! Query building and traversal for entwine.
//!
//! Queries are plain [`QueryDescriptor`] values built in three stages:
//!
//! ```text
//! QueryDescriptor ──► ValidateTransform ──► SqliteRenderer ──► RenderedQuery
//!  (builder/hops)      (registry checks)     (JOINs, params)    (sql + params)
//! ```
//!
//! ```rust
//! use entwine_core::schema::{Edge, EntityType, Field, Registry};
//! use entwine_query::predicate::eq;
//! use entwine_query::{QueryDescriptor, QueryRenderer, Selection, SqliteRenderer};
//!
//! let mut registry = Registry::new();
//! registry.define(
//!     EntityType::new("User")
//!         .field(Field::string("name"))
//!         .edge(Edge::to("cars", "Car")),
//! )?;
//! registry.define(
//!     EntityType::new("Car")
//!         .field(Field::string("model"))
//!         .edge(Edge::from("owner", "User").reference("cars").unique()),
//! )?;
//!
//! let query = QueryDescriptor::new("User")
//!     .filter(eq("name", "a8m"))
//!     .query_edge(&registry, "cars")?;
//! let rendered = SqliteRenderer::new(&registry).render(&query, Selection::Entities)?;
//! assert_eq!(rendered.entity, "Car");
//! # Ok::<(), entwine_core::Error>(())
//! ```

pub mod ir;
pub mod predicate;
pub mod render;
pub mod transform;
mod traverse;

pub use ir::{Direction, Hop, Order, QueryDescriptor};
pub use predicate::Predicate;
pub use render::{quote, QueryRenderer, RenderedQuery, Selection, SqliteRenderer};
pub use transform::{QueryTransform, ValidateTransform};

#[cfg(test)]
pub(crate) mod test_support {
    use entwine_core::schema::{Edge, EntityType, Field, Registry};

    /// Users own cars and belong to groups
    pub fn demo_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .define(
                EntityType::new("User")
                    .field(Field::int("age").positive())
                    .field(Field::string("name").default("unknown"))
                    .edge(Edge::to("cars", "Car"))
                    .edge(Edge::from("groups", "Group").reference("users")),
            )
            .unwrap();
        registry
            .define(
                EntityType::new("Car")
                    .field(Field::string("model"))
                    .field(Field::time("registered_at"))
                    .edge(Edge::from("owner", "User").reference("cars").unique()),
            )
            .unwrap();
        registry
            .define(
                EntityType::new("Group")
                    .field(Field::string("name"))
                    .edge(Edge::to("users", "User")),
            )
            .unwrap();
        registry
    }
}
