//! The demo registry: users own cars and belong to groups

use entwine_core::schema::{Edge, EntityType, Field, Registry};
use entwine_core::Result;

pub fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry.define(
        EntityType::new("User")
            .field(Field::int("age").positive())
            .field(Field::string("name").default("unknown"))
            .edge(Edge::to("cars", "Car"))
            .edge(Edge::from("groups", "Group").reference("users")),
    )?;
    registry.define(
        EntityType::new("Car")
            .field(Field::string("model"))
            .field(Field::time("registered_at").default_now())
            .edge(Edge::from("owner", "User").reference("cars").unique()),
    )?;
    registry.define(
        EntityType::new("Group")
            .field(Field::string("name").not_empty().max_len(64))
            .edge(Edge::to("users", "User")),
    )?;
    registry.validate()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_registry_is_valid() {
        let registry = registry().unwrap();
        let names: Vec<_> = registry.types().map(|t| t.name().to_string()).collect();
        assert_eq!(names.len(), 3);
        assert!(registry.edge("Group", "users").is_ok());
        assert!(registry.edge("User", "groups").is_ok());
    }
}
