use anyhow::Result;
use entwine_core::{Context, Registry};
use entwine_sqlite::{ddl, Client, MaterializeReport};

/// DDL the demo registry materializes to
pub fn statements(registry: &Registry) -> Result<Vec<String>> {
    Ok(ddl(registry)?)
}

pub async fn apply(client: &Client, ctx: &Context) -> Result<MaterializeReport> {
    Ok(client.materialize(ctx).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_cover_every_table() {
        let registry = crate::schema::registry().unwrap();
        let sql = statements(&registry).unwrap().join("\n");
        for table in ["\"users\"", "\"cars\"", "\"groups\"", "\"group_users\""] {
            assert!(sql.contains(table), "missing {table} in:\n{sql}");
        }
    }

    #[tokio::test]
    async fn test_apply_twice() {
        let client = Client::memory(crate::schema::registry().unwrap()).unwrap();
        let ctx = Context::new();
        let first = apply(&client, &ctx).await.unwrap();
        let second = apply(&client, &ctx).await.unwrap();
        assert!(!first.created.is_empty());
        assert!(second.created.is_empty());
    }
}
