//! Conversions between engine values and SQLite rows

use crate::error::{SqliteError, SqliteResult};
use entwine_core::schema::{Column, ColumnKind};
use entwine_core::value::{format_time, parse_time};
use entwine_core::{Entity, FieldType, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, ToSql};
use std::collections::HashMap;

/// Storage form of a value: bools as 0/1, times as RFC 3339 text
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Time(t) => SqlValue::Text(format_time(t)),
    }
}

fn read_value(row: &Row<'_>, idx: usize, field_type: FieldType) -> SqliteResult<Value> {
    let value = match field_type {
        FieldType::Int => row.get::<_, Option<i64>>(idx)?.map(Value::Int),
        FieldType::Float => row.get::<_, Option<f64>>(idx)?.map(Value::Float),
        FieldType::Bool => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
        FieldType::String => row.get::<_, Option<String>>(idx)?.map(Value::String),
        FieldType::Time => match row.get::<_, Option<String>>(idx)? {
            Some(text) => Some(Value::Time(parse_time(&text).map_err(|e| {
                SqliteError::Conversion(format!("invalid time {:?}: {}", text, e))
            })?)),
            None => None,
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Build an entity from a row selected in `columns` order
pub(crate) fn read_entity(row: &Row<'_>, entity: &str, columns: &[Column]) -> SqliteResult<Entity> {
    let mut id = None;
    let mut fields = Vec::new();
    let mut edges = Vec::new();

    for (idx, column) in columns.iter().enumerate() {
        match &column.kind {
            ColumnKind::Id => id = Some(row.get::<_, i64>(idx)?),
            ColumnKind::Field(field_type) => {
                fields.push((column.name.clone(), read_value(row, idx, *field_type)?))
            }
            ColumnKind::ForeignKey { edge } => {
                if let Some(target) = row.get::<_, Option<i64>>(idx)? {
                    edges.push((edge.clone(), target));
                }
            }
        }
    }

    let id = id.ok_or_else(|| SqliteError::Conversion(format!("{} row without id", entity)))?;
    let mut out = Entity::new(entity, id);
    for (name, value) in fields {
        out.set_field(name, value);
    }
    for (edge, target) in edges {
        out.set_edge_id(edge, Some(target));
    }
    Ok(out)
}

fn named(params: &HashMap<String, Value>) -> Vec<(String, SqlValue)> {
    params
        .iter()
        .map(|(name, value)| (format!(":{}", name), to_sql(value)))
        .collect()
}

/// Run a statement with named parameters (keys without the leading `:`)
pub(crate) fn query_named<T, F>(
    conn: &Connection,
    sql: &str,
    params: &HashMap<String, Value>,
    mut f: F,
) -> SqliteResult<Vec<T>>
where
    F: FnMut(&Row<'_>) -> SqliteResult<T>,
{
    let owned = named(params);
    let bound: Vec<(&str, &dyn ToSql)> = owned
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(bound.as_slice())?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(f(row)?);
    }
    Ok(out)
}

/// Execute a statement with named parameters, returning the changed row count
pub(crate) fn execute_named(
    conn: &Connection,
    sql: &str,
    params: &HashMap<String, Value>,
) -> SqliteResult<usize> {
    let owned = named(params);
    let bound: Vec<(&str, &dyn ToSql)> = owned
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    Ok(conn.execute(sql, bound.as_slice())?)
}

/// `?, ?, ?` for `n` positional parameters
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
