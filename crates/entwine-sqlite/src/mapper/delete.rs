//! Delete builders

use super::{detach, not_found, ID_CHUNK};
use crate::client::Client;
use crate::error::{SqliteError, SqliteResult};
use crate::row::{placeholders, query_named};
use entwine_core::schema::ID_FIELD;
use entwine_core::{Context, Operation, Result};
use entwine_query::predicate::Predicate;
use entwine_query::{
    quote, QueryDescriptor, QueryRenderer, QueryTransform, Selection, SqliteRenderer,
    ValidateTransform,
};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

fn delete_ids(conn: &Connection, table: &str, ids: &[i64]) -> SqliteResult<usize> {
    let mut deleted = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            quote(table),
            quote(ID_FIELD),
            placeholders(chunk.len())
        );
        deleted += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(deleted)
}

/// Builder deleting one instance by identity
#[derive(Clone, Debug)]
pub struct DeleteOne {
    client: Client,
    entity_type: String,
    id: i64,
}

impl DeleteOne {
    pub(crate) fn new(client: Client, entity_type: &str, id: i64) -> Self {
        Self {
            client,
            entity_type: entity_type.to_string(),
            id,
        }
    }

    /// Delete the row, clearing the edges that point at it. `NotFound` if it
    /// was already gone.
    pub async fn exec(self, ctx: &Context) -> Result<()> {
        let registry = self.client.registry_arc();
        let table = registry.resolve(&self.entity_type)?.table_name();
        let entity = self.entity_type.clone();
        let id = self.id;

        self.client
            .pool()
            .run(ctx, Operation::Delete, &self.entity_type, move |conn, guard| {
                let tx = conn.transaction()?;
                detach(&tx, &registry, &entity, &[id])?;
                if delete_ids(&tx, &table, &[id])? == 0 {
                    return Err(not_found(&entity));
                }
                if guard.is_done() {
                    return Err(SqliteError::Interrupted);
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }
}

/// Builder deleting every instance matching a filter
#[derive(Clone, Debug)]
pub struct Delete {
    client: Client,
    query: QueryDescriptor,
}

impl Delete {
    pub(crate) fn new(client: Client, entity_type: &str) -> Self {
        Self {
            client,
            query: QueryDescriptor::new(entity_type),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query = self.query.filter(predicate);
        self
    }

    /// Delete matching rows, returning how many were deleted
    pub async fn exec(self, ctx: &Context) -> Result<usize> {
        let registry = self.client.registry_arc();
        let entity = self.query.origin.clone();
        let ir = ValidateTransform::new(&registry).transform(self.query)?;
        let rendered = SqliteRenderer::new(&registry).render(&ir, Selection::Ids)?;
        let table = registry.resolve(&entity)?.table_name();

        let task_entity = entity.clone();
        self.client
            .pool()
            .run(ctx, Operation::Delete, &entity, move |conn, guard| {
                let tx = conn.transaction()?;
                // Collect ids first; clearing edges may change what the filter matches
                let ids = query_named(&tx, &rendered.sql, &rendered.params, |row| {
                    Ok(row.get::<_, i64>(0)?)
                })?;
                debug!(entity = %task_entity, rows = ids.len(), "Deleting rows");

                detach(&tx, &registry, &task_entity, &ids)?;
                let deleted = delete_ids(&tx, &table, &ids)?;
                if guard.is_done() {
                    return Err(SqliteError::Interrupted);
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::demo_client;
    use entwine_core::Context;
    use entwine_query::predicate::{eq, gt, lt};

    #[tokio::test]
    async fn test_delete_one_clears_edges() {
        let client = demo_client().await;
        let ctx = Context::new();
        let a8m = client
            .create("User")
            .unwrap()
            .set("age", 30)
            .unwrap()
            .save(&ctx)
            .await
            .unwrap();
        let car = client
            .create("Car")
            .unwrap()
            .set("model", "Ford")
            .unwrap()
            .set("registered_at", chrono::Utc::now())
            .unwrap()
            .set_edge("owner", &a8m)
            .unwrap()
            .save(&ctx)
            .await
            .unwrap();

        client.delete_one(&a8m).unwrap().exec(&ctx).await.unwrap();

        let car = client.get(&ctx, "Car", car.id()).await.unwrap();
        assert_eq!(car.edge_id("owner"), None);

        let err = client.delete_one(&a8m).unwrap().exec(&ctx).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_bulk_delete() {
        let client = demo_client().await;
        let ctx = Context::new();
        for (name, age) in [("a", 10), ("b", 20), ("c", 30)] {
            client
                .create("User")
                .unwrap()
                .set("name", name)
                .unwrap()
                .set("age", age)
                .unwrap()
                .exec(&ctx)
                .await
                .unwrap();
        }

        let deleted = client
            .delete("User")
            .unwrap()
            .filter(lt("age", 25))
            .exec(&ctx)
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let left = client.query("User").all(&ctx).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].get_str("name"), Some("c"));

        let none = client
            .delete("User")
            .unwrap()
            .filter(eq("name", "nobody"))
            .exec(&ctx)
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_bulk_delete_beyond_variable_limit() {
        let client = demo_client().await;
        let ctx = Context::new();
        client
            .pool()
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO \"users\" (\"age\", \"name\") \
                     WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 40000) \
                     SELECT x, 'user' || x FROM n",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        let ids = client.query("User").ids(&ctx).await.unwrap();
        assert_eq!(ids.len(), 40_000);

        let group = client
            .create("Group")
            .unwrap()
            .set("name", "everyone")
            .unwrap()
            .add_edge_ids("users", ids.clone())
            .unwrap()
            .save(&ctx)
            .await
            .unwrap();
        let members = client.query_edge(&group, "users").unwrap();
        assert_eq!(members.clone().count(&ctx).await.unwrap(), 40_000);

        client
            .update_one(&group)
            .unwrap()
            .remove_edge_ids("users", ids[..35_000].to_vec())
            .unwrap()
            .save(&ctx)
            .await
            .unwrap();
        assert_eq!(members.clone().count(&ctx).await.unwrap(), 5_000);

        let deleted = client
            .delete("User")
            .unwrap()
            .filter(gt("age", 0))
            .exec(&ctx)
            .await
            .unwrap();
        assert_eq!(deleted, 40_000);
        assert_eq!(client.query("User").count(&ctx).await.unwrap(), 0);
        assert_eq!(members.count(&ctx).await.unwrap(), 0);
    }
}
