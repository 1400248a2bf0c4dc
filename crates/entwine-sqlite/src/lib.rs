//! SQLite storage backend for entwine
//!
//! Maps registry types onto tables and executes mapper builders and query
//! descriptors against one SQLite connection.
//!
//! ## Features
//!
//! - **Materialization**: idempotent `CREATE ... IF NOT EXISTS` for every type,
//!   foreign key and join table
//! - **Relational mapper**: create/update/delete builders that write a row and
//!   its edges in one transaction
//! - **Query execution**: one joined statement per traversal chain
//! - **Cancellation**: every call takes a [`Context`](entwine_core::Context);
//!   cancelling it interrupts the running statement
//!
//! ## Usage
//!
//! ```rust,no_run
//! use entwine_core::schema::{Edge, EntityType, Field, Registry};
//! use entwine_core::Context;
//! use entwine_query::predicate::eq;
//! use entwine_sqlite::{Client, SqliteConfig};
//!
//! # async fn demo() -> entwine_core::Result<()> {
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
//! let client = Client::open(SqliteConfig::from_dsn("file:ent?mode=memory&_fk=1")?, registry)?;
//! let ctx = Context::new();
//! client.materialize(&ctx).await?;
//!
//! let tesla = client.create("Car")?.set("model", "Tesla")?.save(&ctx).await?;
//! let a8m = client
//!     .create("User")?
//!     .set("name", "a8m")?
//!     .add_edge("cars", &[&tesla])?
//!     .save(&ctx)
//!     .await?;
//!
//! let cars = client.query_edge(&a8m, "cars")?.all(&ctx).await?;
//! let owner = client
//!     .query("Car")
//!     .filter(eq("model", "Tesla"))
//!     .query_edge("owner")?
//!     .only(&ctx)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod mapper;
pub mod query;
mod row;
pub mod schema;

// Re-exports
pub use client::Client;
pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use mapper::{Create, Delete, DeleteOne, Update, UpdateOne};
pub use query::Query;
pub use schema::{ddl, MaterializeReport};
