//! CreateUser / QueryUser / CreateCars / QueryCars / QueryCarUsers

use anyhow::Result;
use entwine_core::{Context, Entity};
use entwine_query::predicate::eq;
use entwine_sqlite::Client;
use tracing::info;

use crate::output::Step;

pub async fn create_user(client: &Client, ctx: &Context) -> Result<Entity> {
    let user = client
        .create("User")?
        .set("age", 30)?
        .set("name", "a8m")?
        .save(ctx)
        .await?;
    info!(id = user.id(), "User created");
    Ok(user)
}

pub async fn query_user(client: &Client, ctx: &Context) -> Result<Entity> {
    Ok(client
        .query("User")
        .filter(eq("name", "a8m"))
        .only(ctx)
        .await?)
}

/// Create Tesla and Ford and hand both to `owner`
pub async fn create_cars(client: &Client, ctx: &Context, owner: &Entity) -> Result<Vec<Entity>> {
    let mut cars = Vec::new();
    for model in ["Tesla", "Ford"] {
        let car = client
            .create("Car")?
            .set("model", model)?
            .set("registered_at", chrono::Utc::now())?
            .save(ctx)
            .await?;
        cars.push(car);
    }

    let refs: Vec<&Entity> = cars.iter().collect();
    client
        .update_one(owner)?
        .add_edge("cars", &refs)?
        .exec(ctx)
        .await?;
    info!(owner = owner.id(), cars = cars.len(), "Cars associated");
    Ok(cars)
}

/// All of the user's cars, then only the Ford
pub async fn query_cars(client: &Client, ctx: &Context, user: &Entity) -> Result<(Vec<Entity>, Entity)> {
    let cars = client.query_edge(user, "cars")?.all(ctx).await?;
    let ford = client
        .query_edge(user, "cars")?
        .filter(eq("model", "Ford"))
        .only(ctx)
        .await?;
    Ok((cars, ford))
}

/// Owner of every car, walked back through the inverse edge
pub async fn query_car_users(client: &Client, ctx: &Context, user: &Entity) -> Result<Vec<Entity>> {
    let cars = client.query_edge(user, "cars")?.all(ctx).await?;
    let mut owners = Vec::with_capacity(cars.len());
    for car in &cars {
        owners.push(client.query_edge(car, "owner")?.only(ctx).await?);
    }
    Ok(owners)
}

pub async fn run(client: &Client, ctx: &Context) -> Result<Vec<Step>> {
    let created = create_user(client, ctx).await?;
    let user = query_user(client, ctx).await?;
    let cars = create_cars(client, ctx, &user).await?;
    let (owned, ford) = query_cars(client, ctx, &user).await?;
    let owners = query_car_users(client, ctx, &user).await?;

    Ok(vec![
        Step::one("CreateUser", created),
        Step::one("QueryUser", user),
        Step::new("CreateCars", cars),
        Step::new("QueryCars", owned),
        Step::one("QueryCarFord", ford),
        Step::new("QueryCarUsers", owners),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::demo_client;

    #[tokio::test]
    async fn test_basics_walkthrough() {
        let (client, ctx) = demo_client().await;
        let steps = run(&client, &ctx).await.unwrap();

        let created = &steps[0].entities[0];
        assert_eq!(steps[1].entities[0].id(), created.id());

        let mut models = steps[3].values("model");
        models.sort();
        assert_eq!(models, vec!["Ford", "Tesla"]);
        assert_eq!(steps[4].values("model"), vec!["Ford"]);

        assert_eq!(steps[5].entities.len(), 2);
        assert!(steps[5].entities.iter().all(|owner| owner.id() == created.id()));
    }

    #[tokio::test]
    async fn test_query_user_before_create() {
        let (client, ctx) = demo_client().await;
        let err = query_user(&client, &ctx).await.unwrap_err();
        let err = err.downcast::<entwine_core::Error>().unwrap();
        assert!(err.is_not_found());
    }
}
