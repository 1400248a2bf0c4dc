//! Entity registry and schema declarations
//!
//! Types are declared with builder values and collected in a [`Registry`]:
//!
//! ```rust
//! use entwine_core::schema::{Edge, EntityType, Field, Registry};
//!
//! let mut registry = Registry::new();
//! registry.define(
//!     EntityType::new("User")
//!         .field(Field::int("age").positive())
//!         .field(Field::string("name").default("unknown"))
//!         .edge(Edge::to("cars", "Car")),
//! )?;
//! registry.define(
//!     EntityType::new("Car")
//!         .field(Field::string("model"))
//!         .edge(Edge::from("owner", "User").reference("cars").unique()),
//! )?;
//! registry.validate()?;
//! # Ok::<(), entwine_core::Error>(())
//! ```

mod edge;
mod entity_type;
mod field;
mod registry;

pub use edge::{Cardinality, Edge, EdgeKind, EdgeStorage, Relation};
pub use entity_type::{snake_case, EntityType, ID_FIELD};
pub use field::{Field, Validator};
pub use registry::{Column, ColumnKind, ForeignKey, JoinTable, Registry};
