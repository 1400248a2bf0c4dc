//! Edge traversal: appending hops to a descriptor.

use crate::ir::{Hop, QueryDescriptor};
use crate::predicate::id_eq;
use entwine_core::{Entity, Registry, Result};

impl QueryDescriptor {
    /// Follow `edge` from the current type.
    ///
    /// Later predicates attach to the type the edge reaches. Ordering, limit
    /// and offset always apply to the final hop, so they are reset here.
    pub fn query_edge(mut self, registry: &Registry, edge: &str) -> Result<Self> {
        let from = self.current_type().to_string();
        let relation = registry.edge(&from, edge)?;

        self.hops.push(Hop {
            edge: edge.to_string(),
            from,
            target: relation.target,
            predicates: Vec::new(),
        });
        self.order.clear();
        self.limit = None;
        self.offset = None;
        Ok(self)
    }

    /// Start a traversal at a single materialized instance
    pub fn from_entity(registry: &Registry, entity: &Entity, edge: &str) -> Result<Self> {
        registry.resolve(entity.entity_type())?;
        QueryDescriptor::new(entity.entity_type())
            .filter(id_eq(entity.id()))
            .query_edge(registry, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::eq;
    use crate::test_support::demo_registry;
    use entwine_core::Error;

    #[test]
    fn test_chain_composes_left_to_right() {
        let registry = demo_registry();
        let q = QueryDescriptor::new("Group")
            .filter(eq("name", "GitHub"))
            .query_edge(&registry, "users")
            .unwrap()
            .query_edge(&registry, "cars")
            .unwrap();

        let path: Vec<_> = q
            .hops
            .iter()
            .map(|h| (h.from.as_str(), h.edge.as_str(), h.target.as_str()))
            .collect();
        assert_eq!(path, vec![("Group", "users", "User"), ("User", "cars", "Car")]);
        assert_eq!(q.current_type(), "Car");
    }

    #[test]
    fn test_unknown_edge_on_current_type() {
        let registry = demo_registry();
        // `cars` exists on User, not on Group
        let err = QueryDescriptor::new("Group")
            .query_edge(&registry, "cars")
            .unwrap_err();
        assert_eq!(err, Error::unknown_edge("Group", "cars"));
    }

    #[test]
    fn test_from_entity_pins_origin_id() {
        let registry = demo_registry();
        let a8m = Entity::new("User", 7);
        let q = QueryDescriptor::from_entity(&registry, &a8m, "cars").unwrap();

        assert_eq!(q.origin, "User");
        assert_eq!(q.predicates, vec![id_eq(7)]);
        assert_eq!(q.current_type(), "Car");
    }

    #[test]
    fn test_query_edge_resets_paging() {
        let registry = demo_registry();
        let q = QueryDescriptor::new("User")
            .limit(1)
            .query_edge(&registry, "cars")
            .unwrap();
        assert_eq!(q.limit, None);
    }
}
