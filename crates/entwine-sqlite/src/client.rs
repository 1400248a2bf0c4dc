//! Client: the registry plus a connection, and the entry point for every builder

use crate::config::SqliteConfig;
use crate::connection::SqlitePool;
use crate::mapper::{load, Create, Delete, DeleteOne, Update, UpdateOne};
use crate::query::Query;
use crate::schema::{self, MaterializeReport};
use entwine_core::{Context, Entity, Error, Operation, Registry, Result};
use entwine_query::QueryDescriptor;
use std::sync::Arc;
use tracing::info;

/// Handle to one store. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Client {
    pool: SqlitePool,
    registry: Arc<Registry>,
}

impl Client {
    /// Validate the registry and open the store it will be used with
    pub fn open(config: SqliteConfig, registry: Registry) -> Result<Self> {
        registry.validate()?;
        let pool = SqlitePool::new(config.clone())
            .map_err(|e| e.into_error(Operation::Connect, &config.path))?;
        info!(
            path = %config.path,
            types = registry.types().count(),
            "Client opened"
        );
        Ok(Self {
            pool,
            registry: Arc::new(registry),
        })
    }

    /// Client over a private in-memory database
    pub fn memory(registry: Registry) -> Result<Self> {
        Self::open(SqliteConfig::memory(), registry)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_arc(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create every missing table, index and join table
    pub async fn materialize(&self, ctx: &Context) -> Result<MaterializeReport> {
        let structures = schema::plan(&self.registry)?;
        self.pool
            .run(ctx, Operation::Materialize, "schema", move |conn, guard| {
                schema::materialize(conn, &structures, guard)
            })
            .await
    }

    pub fn create(&self, entity_type: &str) -> Result<Create> {
        let entity_type = self.registry.resolve(entity_type)?;
        Ok(Create::new(self.clone(), entity_type))
    }

    pub fn update(&self, entity_type: &str) -> Result<Update> {
        let entity_type = self.registry.resolve(entity_type)?;
        Ok(Update::new(self.clone(), entity_type.name()))
    }

    pub fn update_one(&self, entity: &Entity) -> Result<UpdateOne> {
        let entity_type = self.registry.resolve(entity.entity_type())?;
        Ok(UpdateOne::new(self.clone(), entity_type.name(), entity.id()))
    }

    pub fn delete(&self, entity_type: &str) -> Result<Delete> {
        let entity_type = self.registry.resolve(entity_type)?;
        Ok(Delete::new(self.clone(), entity_type.name()))
    }

    pub fn delete_one(&self, entity: &Entity) -> Result<DeleteOne> {
        let entity_type = self.registry.resolve(entity.entity_type())?;
        Ok(DeleteOne::new(self.clone(), entity_type.name(), entity.id()))
    }

    /// Query over every instance of `entity_type`.
    ///
    /// The type is checked when the query executes.
    pub fn query(&self, entity_type: &str) -> Query {
        Query::new(self.clone(), QueryDescriptor::new(entity_type))
    }

    /// Start a traversal at one instance
    pub fn query_edge(&self, entity: &Entity, edge: &str) -> Result<Query> {
        let ir = QueryDescriptor::from_entity(&self.registry, entity, edge)?;
        Ok(Query::new(self.clone(), ir))
    }

    /// Load one instance by id; `NotFound` if there is none
    pub async fn get(&self, ctx: &Context, entity_type: &str, id: i64) -> Result<Entity> {
        self.registry.resolve(entity_type)?;
        let registry = self.registry_arc();
        let entity = entity_type.to_string();
        let found = self
            .pool
            .run(ctx, Operation::Query, entity_type, move |conn, _| {
                load(conn, &registry, &entity, id)
            })
            .await?;
        found.ok_or_else(|| Error::NotFound {
            entity: entity_type.to_string(),
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("path", &self.pool.config().path)
            .finish_non_exhaustive()
    }
}
