//! Predicates over fields and edges.
//!
//! Constructors are free functions so call sites read like the condition:
//! `and(vec![eq("name", "Ariel"), has_edge("cars")])`, `!eq("model", "Mazda")`.

use entwine_core::schema::ID_FIELD;
use entwine_core::Value;
use serde::Serialize;

/// Ordered comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// String pattern operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchOp {
    Contains,
    HasPrefix,
    HasSuffix,
}

/// A condition evaluated against the entity type of the hop it is attached to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Predicate {
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    Match {
        field: String,
        op: MatchOp,
        pattern: String,
    },
    In {
        field: String,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        field: String,
        negated: bool,
    },
    /// At least one related instance over `edge` (satisfying `with`, if any)
    HasEdge { edge: String, with: Vec<Predicate> },
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Field name this predicate reads, for single-field predicates
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Compare { field, .. }
            | Self::Match { field, .. }
            | Self::In { field, .. }
            | Self::Null { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Predicate {
    Predicate::Compare {
        field: field.into(),
        op,
        value: value.into(),
    }
}

pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(field, CompareOp::Eq, value)
}

pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(field, CompareOp::Ne, value)
}

pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(field, CompareOp::Lt, value)
}

pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(field, CompareOp::Lte, value)
}

pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(field, CompareOp::Gt, value)
}

pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
    compare(field, CompareOp::Gte, value)
}

pub fn id_eq(id: i64) -> Predicate {
    eq(ID_FIELD, id)
}

pub fn id_in(ids: impl IntoIterator<Item = i64>) -> Predicate {
    is_in(ID_FIELD, ids)
}

pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Predicate {
    Predicate::In {
        field: field.into(),
        values: values.into_iter().map(Into::into).collect(),
        negated: false,
    }
}

pub fn not_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Predicate {
    Predicate::In {
        field: field.into(),
        values: values.into_iter().map(Into::into).collect(),
        negated: true,
    }
}

pub fn is_null(field: impl Into<String>) -> Predicate {
    Predicate::Null {
        field: field.into(),
        negated: false,
    }
}

pub fn not_null(field: impl Into<String>) -> Predicate {
    Predicate::Null {
        field: field.into(),
        negated: true,
    }
}

fn pattern(field: impl Into<String>, op: MatchOp, pattern: impl Into<String>) -> Predicate {
    Predicate::Match {
        field: field.into(),
        op,
        pattern: pattern.into(),
    }
}

/// Substring match (ASCII case-insensitive, as SQLite `LIKE`)
pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Predicate {
    pattern(field, MatchOp::Contains, needle)
}

pub fn has_prefix(field: impl Into<String>, prefix: impl Into<String>) -> Predicate {
    pattern(field, MatchOp::HasPrefix, prefix)
}

pub fn has_suffix(field: impl Into<String>, suffix: impl Into<String>) -> Predicate {
    pattern(field, MatchOp::HasSuffix, suffix)
}

/// At least one related instance over `edge`
pub fn has_edge(edge: impl Into<String>) -> Predicate {
    Predicate::HasEdge {
        edge: edge.into(),
        with: Vec::new(),
    }
}

/// At least one related instance over `edge` matching every predicate in `with`
pub fn has_edge_with(edge: impl Into<String>, with: Vec<Predicate>) -> Predicate {
    Predicate::HasEdge {
        edge: edge.into(),
        with,
    }
}

pub fn not(predicate: Predicate) -> Predicate {
    !predicate
}

pub fn and(predicates: Vec<Predicate>) -> Predicate {
    Predicate::And(predicates)
}

pub fn or(predicates: Vec<Predicate>) -> Predicate {
    Predicate::Or(predicates)
}
