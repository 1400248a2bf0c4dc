//! Query execution: typed builder over a descriptor plus terminal calls.
//!
//! Every terminal validates the descriptor, renders one statement and runs
//! it on the client's connection.

use crate::client::Client;
use crate::row::{query_named, read_entity};
use entwine_core::{Context, Entity, Error, Operation, Result};
use entwine_query::predicate::Predicate;
use entwine_query::{
    Order, QueryDescriptor, QueryRenderer, QueryTransform, RenderedQuery, Selection,
    SqliteRenderer, ValidateTransform,
};
use tracing::debug;

/// `only` needs two rows to tell one match from several
const ONLY_LIMIT: u64 = 2;

/// Query builder bound to a client
#[derive(Clone, Debug)]
pub struct Query {
    client: Client,
    ir: QueryDescriptor,
}

impl Query {
    pub(crate) fn new(client: Client, ir: QueryDescriptor) -> Self {
        Self { client, ir }
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.ir
    }

    pub fn into_descriptor(self) -> QueryDescriptor {
        self.ir
    }

    /// AND a predicate onto the current hop
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.ir = self.ir.filter(predicate);
        self
    }

    /// Follow `edge` from the current type; `UnknownEdge` if it is not declared
    pub fn query_edge(mut self, edge: &str) -> Result<Self> {
        self.ir = self.ir.query_edge(self.client.registry(), edge)?;
        Ok(self)
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.ir = self.ir.order_by(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.ir = self.ir.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.ir = self.ir.offset(offset);
        self
    }

    /// Validated, rendered statement for `selection`
    pub fn render(&self, selection: Selection) -> Result<RenderedQuery> {
        let registry = self.client.registry();
        let ir = ValidateTransform::new(registry).transform(self.ir.clone())?;
        SqliteRenderer::new(registry).render(&ir, selection)
    }

    fn entity(&self) -> String {
        self.ir.current_type().to_string()
    }

    /// Every match; empty (not an error) when nothing matches
    pub async fn all(self, ctx: &Context) -> Result<Vec<Entity>> {
        let rendered = self.render(Selection::Entities)?;
        let entity = self.entity();
        self.client
            .pool()
            .run(ctx, Operation::Query, &entity, move |conn, _| {
                debug!(
                    entity = %rendered.entity,
                    sql = %rendered.sql,
                    params = rendered.params.len(),
                    "Executing query"
                );
                query_named(conn, &rendered.sql, &rendered.params, |row| {
                    read_entity(row, &rendered.entity, &rendered.columns)
                })
            })
            .await
    }

    /// Exactly one match: `NotFound` on none, `MultipleResults` on several
    pub async fn only(self, ctx: &Context) -> Result<Entity> {
        let limit = self.ir.limit.map_or(ONLY_LIMIT, |l| l.min(ONLY_LIMIT));
        let entity = self.entity();
        let mut found = self.limit(limit).all(ctx).await?;
        match found.len() {
            0 => Err(Error::NotFound { entity }),
            1 => Ok(found.remove(0)),
            _ => Err(Error::MultipleResults { entity }),
        }
    }

    /// First match, if any
    pub async fn first(self, ctx: &Context) -> Result<Option<Entity>> {
        let found = self.limit(1).all(ctx).await?;
        Ok(found.into_iter().next())
    }

    /// Distinct ids of every match
    pub async fn ids(self, ctx: &Context) -> Result<Vec<i64>> {
        let rendered = self.render(Selection::Ids)?;
        let entity = self.entity();
        self.client
            .pool()
            .run(ctx, Operation::Query, &entity, move |conn, _| {
                debug!(sql = %rendered.sql, params = rendered.params.len(), "Executing query");
                query_named(conn, &rendered.sql, &rendered.params, |row| {
                    Ok(row.get::<_, i64>(0)?)
                })
            })
            .await
    }

    /// Id of the single match, with the same errors as [`Query::only`]
    pub async fn only_id(self, ctx: &Context) -> Result<i64> {
        let limit = self.ir.limit.map_or(ONLY_LIMIT, |l| l.min(ONLY_LIMIT));
        let entity = self.entity();
        let ids = self.limit(limit).ids(ctx).await?;
        match ids.as_slice() {
            [] => Err(Error::NotFound { entity }),
            [id] => Ok(*id),
            _ => Err(Error::MultipleResults { entity }),
        }
    }

    /// Number of distinct matches, ignoring limit and offset
    pub async fn count(self, ctx: &Context) -> Result<usize> {
        let n = self.scalar(ctx, Selection::Count).await?;
        Ok(n as usize)
    }

    pub async fn exist(self, ctx: &Context) -> Result<bool> {
        let n = self.scalar(ctx, Selection::Exists).await?;
        Ok(n != 0)
    }

    async fn scalar(self, ctx: &Context, selection: Selection) -> Result<i64> {
        let rendered = self.render(selection)?;
        let entity = self.entity();
        self.client
            .pool()
            .run(ctx, Operation::Query, &entity, move |conn, _| {
                debug!(sql = %rendered.sql, params = rendered.params.len(), "Executing query");
                let values = query_named(conn, &rendered.sql, &rendered.params, |row| {
                    Ok(row.get::<_, i64>(0)?)
                })?;
                Ok(values.first().copied().unwrap_or(0))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::demo_client;
    use entwine_core::{Context, Error};
    use entwine_query::predicate::{eq, gt, has_prefix};
    use entwine_query::Order;

    async fn seed(client: &crate::Client, ctx: &Context) {
        for (name, age) in [("Ariel", 30), ("Neta", 28), ("a8m", 30)] {
            client
                .create("User")
                .unwrap()
                .set("name", name)
                .unwrap()
                .set("age", age)
                .unwrap()
                .exec(ctx)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_only_semantics() {
        let client = demo_client().await;
        let ctx = Context::new();
        seed(&client, &ctx).await;

        let neta = client
            .query("User")
            .filter(eq("name", "Neta"))
            .only(&ctx)
            .await
            .unwrap();
        assert_eq!(neta.get_int("age"), Some(28));

        let err = client
            .query("User")
            .filter(eq("name", "nobody"))
            .only(&ctx)
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotFound { entity: "User".into() });

        let err = client
            .query("User")
            .filter(eq("age", 30))
            .only(&ctx)
            .await
            .unwrap_err();
        assert!(err.is_multiple_results());
    }

    #[tokio::test]
    async fn test_all_empty_is_ok() {
        let client = demo_client().await;
        let ctx = Context::new();
        let users = client
            .query("User")
            .filter(gt("age", 100))
            .all(&ctx)
            .await
            .unwrap();
        assert!(users.is_empty());
        assert!(client.query("User").first(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_order_limit_offset() {
        let client = demo_client().await;
        let ctx = Context::new();
        seed(&client, &ctx).await;

        let names: Vec<_> = client
            .query("User")
            .order_by(Order::asc("age"))
            .order_by(Order::asc("name"))
            .offset(1)
            .limit(1)
            .all(&ctx)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.get_str("name").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Ariel"]);
    }

    #[tokio::test]
    async fn test_scalar_terminals() {
        let client = demo_client().await;
        let ctx = Context::new();
        seed(&client, &ctx).await;

        assert_eq!(client.query("User").count(&ctx).await.unwrap(), 3);
        assert!(client
            .query("User")
            .filter(has_prefix("name", "A"))
            .exist(&ctx)
            .await
            .unwrap());
        assert_eq!(client.query("User").ids(&ctx).await.unwrap().len(), 3);

        let id = client
            .query("User")
            .filter(eq("name", "a8m"))
            .only_id(&ctx)
            .await
            .unwrap();
        let a8m = client.get(&ctx, "User", id).await.unwrap();
        assert_eq!(a8m.get_str("name"), Some("a8m"));
    }

    #[tokio::test]
    async fn test_validation_errors_surface() {
        let client = demo_client().await;
        let ctx = Context::new();

        let err = client
            .query("User")
            .filter(eq("height", 2))
            .all(&ctx)
            .await
            .unwrap_err();
        assert_eq!(err, Error::unknown_field("User", "height"));

        let err = client.query("User").query_edge("pets").err().unwrap();
        assert_eq!(err, Error::unknown_edge("User", "pets"));

        let err = client.query("Boat").count(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
    }
}
