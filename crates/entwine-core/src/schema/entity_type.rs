//! Entity type declarations

use super::edge::Edge;
use super::field::Field;

/// Name of the implicit primary key column
pub const ID_FIELD: &str = "id";

/// A named record kind: ordered fields plus relationship edges
#[derive(Debug, Clone)]
pub struct EntityType {
    name: String,
    table: Option<String>,
    fields: Vec<Field>,
    edges: Vec<Edge>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Override the derived table name
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name: explicit override, else snake_case name plus `s`
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| format!("{}s", snake_case(&self.name)))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn get_edge(&self, name: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.name() == name)
    }
}

/// `UserGroup` -> `user_group`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
