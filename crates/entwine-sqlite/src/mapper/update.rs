//! Update builders: one instance by identity, or every instance matching a filter

use super::{check_cardinality, link, load, not_found, target_ids, unlink, EdgeOp};
use crate::client::Client;
use crate::error::SqliteError;
use crate::row::{execute_named, to_sql};
use entwine_core::schema::{Field, Relation, ID_FIELD};
use entwine_core::{Context, Entity, Error, Operation, Registry, Result, Value};
use entwine_query::predicate::Predicate;
use entwine_query::{
    quote, QueryDescriptor, QueryRenderer, QueryTransform, Selection, SqliteRenderer,
    ValidateTransform,
};
use rusqlite::params_from_iter;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Type-check a new value for a mutable field
fn accept_update(registry: &Registry, entity: &str, field: &str, value: Value) -> Result<Value> {
    let def = registry.field(entity, field)?;
    check_mutable(entity, def)?;
    def.accept(entity, value)
}

fn check_mutable(entity: &str, field: &Field) -> Result<()> {
    if field.is_immutable() {
        return Err(Error::Validation {
            entity: entity.to_string(),
            field: field.name().to_string(),
            reason: "field is immutable".to_string(),
        });
    }
    Ok(())
}

/// Clearing is only allowed on optional fields
fn accept_clear(registry: &Registry, entity: &str, field: &str) -> Result<()> {
    let def = registry.field(entity, field)?;
    check_mutable(entity, def)?;
    if !def.is_optional() {
        return Err(Error::Validation {
            entity: entity.to_string(),
            field: field.to_string(),
            reason: "required field cannot be cleared".to_string(),
        });
    }
    Ok(())
}

/// Run validators on every staged value
fn check_values(registry: &Registry, entity: &str, values: &BTreeMap<String, Value>) -> Result<()> {
    for (name, value) in values {
        registry.field(entity, name)?.check(entity, value)?;
    }
    Ok(())
}

/// Builder for updating one instance
#[derive(Clone, Debug)]
pub struct UpdateOne {
    client: Client,
    entity_type: String,
    id: i64,
    values: BTreeMap<String, Value>,
    edges: Vec<EdgeOp>,
}

impl UpdateOne {
    pub(crate) fn new(client: Client, entity_type: &str, id: i64) -> Self {
        Self {
            client,
            entity_type: entity_type.to_string(),
            id,
            values: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = accept_update(self.client.registry(), &self.entity_type, field, value.into())?;
        self.values.insert(field.to_string(), value);
        Ok(self)
    }

    /// Set an optional field to NULL
    pub fn clear(mut self, field: &str) -> Result<Self> {
        accept_clear(self.client.registry(), &self.entity_type, field)?;
        self.values.insert(field.to_string(), Value::Null);
        Ok(self)
    }

    pub fn add_edge(self, edge: &str, targets: &[&Entity]) -> Result<Self> {
        let (relation, ids) = target_ids(self.client.registry(), &self.entity_type, edge, targets)?;
        self.add(relation, ids)
    }

    pub fn add_edge_ids(self, edge: &str, ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        let relation = self.client.registry().edge(&self.entity_type, edge)?;
        self.add(relation, ids.into_iter().collect())
    }

    pub fn remove_edge(self, edge: &str, targets: &[&Entity]) -> Result<Self> {
        let (relation, ids) = target_ids(self.client.registry(), &self.entity_type, edge, targets)?;
        self.push(EdgeOp::Remove(relation, ids))
    }

    pub fn remove_edge_ids(self, edge: &str, ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        let relation = self.client.registry().edge(&self.entity_type, edge)?;
        self.push(EdgeOp::Remove(relation, ids.into_iter().collect()))
    }

    /// Remove every instance related over `edge`
    pub fn clear_edge(self, edge: &str) -> Result<Self> {
        let relation = self.client.registry().edge(&self.entity_type, edge)?;
        self.push(EdgeOp::Clear(relation))
    }

    /// Replace the instance of a unique edge
    pub fn set_edge(self, edge: &str, target: &Entity) -> Result<Self> {
        let (relation, ids) = target_ids(self.client.registry(), &self.entity_type, edge, &[target])?;
        self.set_unique(relation, ids)
    }

    pub fn set_edge_id(self, edge: &str, id: i64) -> Result<Self> {
        let relation = self.client.registry().edge(&self.entity_type, edge)?;
        self.set_unique(relation, vec![id])
    }

    fn add(self, relation: Relation, ids: Vec<i64>) -> Result<Self> {
        check_cardinality(&relation, ids.len())?;
        if relation.cardinality.is_unique() {
            // A unique edge holds one instance; adding replaces it
            return self.set_unique(relation, ids);
        }
        self.push(EdgeOp::Add(relation, ids))
    }

    fn set_unique(self, relation: Relation, ids: Vec<i64>) -> Result<Self> {
        if !relation.cardinality.is_unique() {
            return Err(Error::EdgeCardinality {
                entity: relation.owner.clone(),
                edge: relation.name.clone(),
            });
        }
        self.push(EdgeOp::Clear(relation.clone()))?
            .push(EdgeOp::Add(relation, ids))
    }

    fn push(mut self, op: EdgeOp) -> Result<Self> {
        self.edges.push(op);
        Ok(self)
    }

    /// Apply the update and return the reloaded instance
    pub async fn save(self, ctx: &Context) -> Result<Entity> {
        let registry = self.client.registry_arc();
        check_values(&registry, &self.entity_type, &self.values)?;

        let table = registry.resolve(&self.entity_type)?.table_name();
        let entity = self.entity_type.clone();
        let id = self.id;
        let values = self.values;
        let edges = self.edges;

        self.client
            .pool()
            .run(ctx, Operation::Update, &self.entity_type, move |conn, guard| {
                let tx = conn.transaction()?;

                let changed = if values.is_empty() {
                    let sql = format!(
                        "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                        quote(&table),
                        quote(ID_FIELD)
                    );
                    tx.query_row(&sql, [id], |row| row.get::<_, i64>(0))? as usize
                } else {
                    let assignments: Vec<String> = values
                        .keys()
                        .map(|name| format!("{} = ?", quote(name)))
                        .collect();
                    let sql = format!(
                        "UPDATE {} SET {} WHERE {} = ?",
                        quote(&table),
                        assignments.join(", "),
                        quote(ID_FIELD)
                    );
                    debug!(sql = %sql, params = values.len() + 1, "Executing update");
                    let mut args: Vec<_> = values.values().map(to_sql).collect();
                    args.push(to_sql(&Value::Int(id)));
                    tx.execute(&sql, params_from_iter(args.iter()))?
                };
                if changed == 0 {
                    return Err(not_found(&entity));
                }

                for op in &edges {
                    match op {
                        EdgeOp::Add(relation, ids) => link(&tx, Operation::Update, relation, id, ids)?,
                        EdgeOp::Remove(relation, ids) => {
                            unlink(&tx, relation, id, Some(ids))?;
                        }
                        EdgeOp::Clear(relation) => {
                            unlink(&tx, relation, id, None)?;
                        }
                    }
                }

                let updated = load(&tx, &registry, &entity, id)?.ok_or_else(|| not_found(&entity))?;
                if guard.is_done() {
                    return Err(SqliteError::Interrupted);
                }
                tx.commit()?;
                Ok(updated)
            })
            .await
    }

    pub async fn exec(self, ctx: &Context) -> Result<()> {
        self.save(ctx).await.map(|_| ())
    }
}

/// Builder for updating every instance matching a filter
#[derive(Clone, Debug)]
pub struct Update {
    client: Client,
    query: QueryDescriptor,
    values: BTreeMap<String, Value>,
}

impl Update {
    pub(crate) fn new(client: Client, entity_type: &str) -> Self {
        Self {
            client,
            query: QueryDescriptor::new(entity_type),
            values: BTreeMap::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query = self.query.filter(predicate);
        self
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = accept_update(self.client.registry(), &self.query.origin, field, value.into())?;
        self.values.insert(field.to_string(), value);
        Ok(self)
    }

    pub fn clear(mut self, field: &str) -> Result<Self> {
        accept_clear(self.client.registry(), &self.query.origin, field)?;
        self.values.insert(field.to_string(), Value::Null);
        Ok(self)
    }

    /// Apply the update, returning the number of affected rows
    pub async fn save(self, ctx: &Context) -> Result<usize> {
        let registry: Arc<Registry> = self.client.registry_arc();
        let entity = self.query.origin.clone();
        check_values(&registry, &entity, &self.values)?;
        let ir = ValidateTransform::new(&registry).transform(self.query)?;
        if self.values.is_empty() {
            return Ok(0);
        }

        let mut rendered = SqliteRenderer::new(&registry).render(&ir, Selection::Ids)?;

        let assignments: Vec<String> = self
            .values
            .iter()
            .enumerate()
            .map(|(i, (name, value))| {
                let param = format!("v{}", i);
                rendered.params.insert(param.clone(), value.clone());
                format!("{} = :{}", quote(name), param)
            })
            .collect();
        let table = registry.resolve(&entity)?.table_name();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} IN ({})",
            quote(&table),
            assignments.join(", "),
            quote(ID_FIELD),
            rendered.sql
        );

        let params = rendered.params;
        self.client
            .pool()
            .run(ctx, Operation::Update, &entity, move |conn, guard| {
                let tx = conn.transaction()?;
                debug!(sql = %sql, params = params.len(), "Executing bulk update");
                let affected = execute_named(&tx, &sql, &params)?;
                if guard.is_done() {
                    return Err(SqliteError::Interrupted);
                }
                tx.commit()?;
                Ok(affected)
            })
            .await
    }

    pub async fn exec(self, ctx: &Context) -> Result<()> {
        self.save(ctx).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::demo_client;
    use entwine_query::predicate::{eq, gt, has_edge};

    async fn user(client: &Client, name: &str, age: i64) -> Entity {
        client
            .create("User")
            .unwrap()
            .set("name", name)
            .unwrap()
            .set("age", age)
            .unwrap()
            .save(&Context::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_one_sets_fields() {
        let client = demo_client().await;
        let a8m = user(&client, "a8m", 30).await;

        let updated = client
            .update_one(&a8m)
            .unwrap()
            .set("age", 31)
            .unwrap()
            .save(&Context::new())
            .await
            .unwrap();
        assert_eq!(updated.id(), a8m.id());
        assert_eq!(updated.get_int("age"), Some(31));
        assert_eq!(updated.get_str("name"), Some("a8m"));
    }

    #[tokio::test]
    async fn test_update_one_vanished_row() {
        let client = demo_client().await;
        let ghost = Entity::new("User", 99);

        let err = client
            .update_one(&ghost)
            .unwrap()
            .set("age", 1)
            .unwrap()
            .save(&Context::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_required_fields_cannot_be_cleared() {
        let client = demo_client().await;
        let a8m = user(&client, "a8m", 30).await;

        let err = client.update_one(&a8m).unwrap().clear("age").err().unwrap();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_update_one_edges() {
        let client = demo_client().await;
        let ctx = Context::new();
        let ariel = user(&client, "Ariel", 30).await;
        let neta = user(&client, "Neta", 28).await;
        let group = client
            .create("Group")
            .unwrap()
            .set("name", "GitLab")
            .unwrap()
            .add_edge("users", &[&ariel])
            .unwrap()
            .save(&ctx)
            .await
            .unwrap();

        client
            .update_one(&group)
            .unwrap()
            .add_edge("users", &[&neta])
            .unwrap()
            .remove_edge("users", &[&ariel])
            .unwrap()
            .exec(&ctx)
            .await
            .unwrap();

        let members = client
            .query_edge(&group, "users")
            .unwrap()
            .all(&ctx)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].get_str("name"), Some("Neta"));

        client
            .update_one(&group)
            .unwrap()
            .clear_edge("users")
            .unwrap()
            .exec(&ctx)
            .await
            .unwrap();
        assert!(!client
            .query_edge(&group, "users")
            .unwrap()
            .exist(&ctx)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_bulk_update_counts_rows() {
        let client = demo_client().await;
        let ctx = Context::new();
        user(&client, "a", 20).await;
        user(&client, "b", 40).await;
        user(&client, "c", 50).await;

        let affected = client
            .update("User")
            .unwrap()
            .filter(gt("age", 30))
            .set("name", "senior")
            .unwrap()
            .save(&ctx)
            .await
            .unwrap();
        assert_eq!(affected, 2);
        assert_eq!(
            client
                .query("User")
                .filter(eq("name", "senior"))
                .count(&ctx)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_bulk_update_without_values_still_validates_filter() {
        let client = demo_client().await;
        let ctx = Context::new();
        user(&client, "a", 20).await;

        let err = client
            .update("User")
            .unwrap()
            .filter(eq("nickname", "a"))
            .save(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }), "{}", err);

        let err = client
            .update("User")
            .unwrap()
            .filter(has_edge("pets"))
            .save(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEdge { .. }), "{}", err);

        let affected = client
            .update("User")
            .unwrap()
            .filter(eq("name", "a"))
            .save(&ctx)
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }
}
