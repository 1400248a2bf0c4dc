//! Query descriptor: origin type, per-hop predicates and traversal steps.
//!
//! A descriptor is a plain value. Builder methods consume it and return the
//! extended value; clone it to fork a query.

use crate::predicate::Predicate;
use serde::Serialize;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering term on a field of the final hop's type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// One edge-following step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hop {
    /// Edge name, declared on `from`
    pub edge: String,
    pub from: String,
    /// Type reached by this hop
    pub target: String,
    /// Predicates on `target`
    pub predicates: Vec<Predicate>,
}

/// Backend-agnostic description of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    pub origin: String,
    /// Predicates on the origin type
    pub predicates: Vec<Predicate>,
    pub hops: Vec<Hop>,
    pub order: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryDescriptor {
    /// Query over every instance of `origin`
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            predicates: Vec::new(),
            hops: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Type the query currently yields: the last hop's target, else the origin
    pub fn current_type(&self) -> &str {
        self.hops
            .last()
            .map(|h| h.target.as_str())
            .unwrap_or(&self.origin)
    }

    /// AND a predicate onto the most recent hop (or the origin)
    pub fn filter(mut self, predicate: Predicate) -> Self {
        match self.hops.last_mut() {
            Some(hop) => hop.predicates.push(predicate),
            None => self.predicates.push(predicate),
        }
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Predicates attached to the type reached last
    pub fn current_predicates(&self) -> &[Predicate] {
        match self.hops.last() {
            Some(hop) => &hop.predicates,
            None => &self.predicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::eq;

    #[test]
    fn test_filter_attaches_to_latest_hop() {
        let mut q = QueryDescriptor::new("Group").filter(eq("name", "GitHub"));
        q.hops.push(Hop {
            edge: "users".into(),
            from: "Group".into(),
            target: "User".into(),
            predicates: vec![],
        });
        let q = q.filter(eq("name", "Ariel"));

        assert_eq!(q.predicates, vec![eq("name", "GitHub")]);
        assert_eq!(q.hops[0].predicates, vec![eq("name", "Ariel")]);
        assert_eq!(q.current_type(), "User");
        assert_eq!(q.current_predicates().len(), 1);
    }

    #[test]
    fn test_builder_returns_new_value() {
        let base = QueryDescriptor::new("Car");
        let limited = base.clone().limit(2).offset(1).order_by(Order::desc("model"));

        assert_eq!(base.limit, None);
        assert!(base.order.is_empty());
        assert_eq!(limited.limit, Some(2));
        assert_eq!(limited.offset, Some(1));
        assert_eq!(limited.order, vec![Order::desc("model")]);
    }
}
