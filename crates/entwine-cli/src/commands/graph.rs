//! CreateGraph / QueryGitHub / QueryArielCars / QueryGroupWithUsers

use anyhow::Result;
use entwine_core::{Context, Entity};
use entwine_query::predicate::{and, eq, has_edge, ne};
use entwine_query::Order;
use entwine_sqlite::Client;
use tracing::info;

use crate::output::Step;

async fn user(client: &Client, ctx: &Context, name: &str, age: i64) -> Result<Entity> {
    Ok(client
        .create("User")?
        .set("name", name)?
        .set("age", age)?
        .save(ctx)
        .await?)
}

async fn group(client: &Client, ctx: &Context, name: &str, members: &[&Entity]) -> Result<Entity> {
    Ok(client
        .create("Group")?
        .set("name", name)?
        .add_edge("users", members)?
        .save(ctx)
        .await?)
}

/// Ariel owns three cars; GitLab has Neta and Ariel, GitHub only Ariel
pub async fn create_graph(client: &Client, ctx: &Context) -> Result<Vec<Entity>> {
    let ariel = user(client, ctx, "Ariel", 30).await?;
    let neta = user(client, ctx, "Neta", 28).await?;

    let mut created = Vec::new();
    for model in ["Tesla", "Mazda", "Ford"] {
        let car = client
            .create("Car")?
            .set("model", model)?
            .set("registered_at", chrono::Utc::now())?
            .set_edge("owner", &ariel)?
            .save(ctx)
            .await?;
        created.push(car);
    }

    let gitlab = group(client, ctx, "GitLab", &[&neta, &ariel]).await?;
    let github = group(client, ctx, "GitHub", &[&ariel]).await?;
    info!(groups = 2, cars = created.len(), "Graph created");

    created.splice(0..0, [ariel, neta]);
    created.extend([gitlab, github]);
    Ok(created)
}

/// Cars of every GitHub member
pub async fn query_github(client: &Client, ctx: &Context) -> Result<Vec<Entity>> {
    Ok(client
        .query("Group")
        .filter(eq("name", "GitHub"))
        .query_edge("users")?
        .query_edge("cars")?
        .all(ctx)
        .await?)
}

/// Cars of everyone sharing a group with Ariel, except the Mazda
pub async fn query_ariel_cars(client: &Client, ctx: &Context) -> Result<Vec<Entity>> {
    let ariel = client
        .query("User")
        .filter(and(vec![has_edge("cars"), eq("name", "Ariel")]))
        .only(ctx)
        .await?;
    Ok(client
        .query_edge(&ariel, "groups")?
        .query_edge("users")?
        .query_edge("cars")?
        .filter(ne("model", "Mazda"))
        .all(ctx)
        .await?)
}

/// Groups with at least one member
pub async fn query_group_with_users(client: &Client, ctx: &Context) -> Result<Vec<Entity>> {
    Ok(client
        .query("Group")
        .filter(has_edge("users"))
        .order_by(Order::asc("name"))
        .all(ctx)
        .await?)
}

pub async fn run(client: &Client, ctx: &Context) -> Result<Vec<Step>> {
    Ok(vec![
        Step::new("CreateGraph", create_graph(client, ctx).await?),
        Step::new("QueryGitHub", query_github(client, ctx).await?),
        Step::new("QueryArielCars", query_ariel_cars(client, ctx).await?),
        Step::new("QueryGroupWithUsers", query_group_with_users(client, ctx).await?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::demo_client;

    fn sorted(mut values: Vec<String>) -> Vec<String> {
        values.sort();
        values
    }

    #[tokio::test]
    async fn test_graph_walkthrough() {
        let (client, ctx) = demo_client().await;
        let steps = run(&client, &ctx).await.unwrap();

        assert_eq!(steps[0].entities.len(), 7);
        assert_eq!(sorted(steps[1].values("model")), vec!["Ford", "Mazda", "Tesla"]);
        assert_eq!(sorted(steps[2].values("model")), vec!["Ford", "Tesla"]);
        assert_eq!(steps[3].values("name"), vec!["GitHub", "GitLab"]);
    }

    #[tokio::test]
    async fn test_ariel_cars_need_an_owner_with_cars() {
        let (client, ctx) = demo_client().await;
        // Ariel without cars does not match the owner lookup
        client
            .create("User")
            .unwrap()
            .set("name", "Ariel")
            .unwrap()
            .set("age", 20)
            .unwrap()
            .exec(&ctx)
            .await
            .unwrap();
        let err = query_ariel_cars(&client, &ctx).await.unwrap_err();
        let err = err.downcast_ref::<entwine_core::Error>().unwrap();
        assert!(err.is_not_found(), "{}", err);

        create_graph(&client, &ctx).await.unwrap();
        let cars = query_ariel_cars(&client, &ctx).await.unwrap();
        let mut models: Vec<_> = cars.iter().filter_map(|c| c.get_str("model")).collect();
        models.sort();
        assert_eq!(models, vec!["Ford", "Tesla"]);
    }

    #[tokio::test]
    async fn test_empty_group_is_not_listed() {
        let (client, ctx) = demo_client().await;
        create_graph(&client, &ctx).await.unwrap();
        client
            .create("Group")
            .unwrap()
            .set("name", "Bitbucket")
            .unwrap()
            .exec(&ctx)
            .await
            .unwrap();

        let groups = query_group_with_users(&client, &ctx).await.unwrap();
        assert_eq!(groups.len(), 2);
    }
}
