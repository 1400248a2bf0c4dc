pub mod basics;
pub mod graph;
pub mod schema;

use anyhow::Result;
use entwine_core::Context;
use entwine_sqlite::Client;
use tracing::info;

use crate::output::Step;

/// basics then graph against one store
pub async fn all(client: &Client, ctx: &Context) -> Result<Vec<Step>> {
    let mut steps = basics::run(client, ctx).await?;
    steps.extend(graph::run(client, ctx).await?);
    info!(steps = steps.len(), "Demo finished");
    Ok(steps)
}

#[cfg(test)]
pub(crate) mod test_support {
    use entwine_core::Context;
    use entwine_sqlite::Client;

    pub async fn demo_client() -> (Client, Context) {
        let client = Client::memory(crate::schema::registry().unwrap()).unwrap();
        let ctx = Context::new();
        client.materialize(&ctx).await.unwrap();
        (client, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::demo_client;

    #[tokio::test]
    async fn test_all_runs_both_walkthroughs() {
        let (client, ctx) = demo_client().await;
        let steps = super::all(&client, &ctx).await.unwrap();
        let names: Vec<_> = steps.iter().map(|s| s.name).collect();
        assert_eq!(names.first(), Some(&"CreateUser"));
        assert_eq!(names.last(), Some(&"QueryGroupWithUsers"));
    }
}
