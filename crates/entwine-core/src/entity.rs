//! Materialized entity instances

use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A row read from (or just written to) the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    #[serde(rename = "type")]
    entity_type: String,
    id: i64,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
    /// FK ids held on this row, keyed by edge name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    edges: BTreeMap<String, i64>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            fields: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_edge_id(mut self, edge: impl Into<String>, id: i64) -> Self {
        self.edges.insert(edge.into(), id);
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_int)
    }

    pub fn get_time(&self, field: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.get(field).and_then(Value::as_time)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Id of the related instance for a unique edge stored on this row
    pub fn edge_id(&self, edge: &str) -> Option<i64> {
        self.edges.get(edge).copied()
    }

    pub fn edge_ids(&self) -> &BTreeMap<String, i64> {
        &self.edges
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn set_edge_id(&mut self, edge: impl Into<String>, id: Option<i64>) {
        let edge = edge.into();
        match id {
            Some(id) => {
                self.edges.insert(edge, id);
            }
            None => {
                self.edges.remove(&edge);
            }
        }
    }
}

impl fmt::Display for Entity {
    /// `User(id=1, age=30, name=a8m)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={}", self.entity_type, self.id)?;
        for (name, value) in &self.fields {
            write!(f, ", {}={}", name, value)?;
        }
        f.write_str(")")
    }
}
