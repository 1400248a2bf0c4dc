//! Schema materialization
//!
//! Turns a registry into `CREATE ... IF NOT EXISTS` statements and applies
//! them in one transaction. Every structure is recorded in the
//! `entwine_schema` bookkeeping table; existing tables are never altered.

use crate::error::{SqliteError, SqliteResult};
use chrono::Utc;
use entwine_core::schema::{EntityType, ID_FIELD};
use entwine_core::value::format_time;
use entwine_core::{Context, FieldType, Registry, Result};
use entwine_query::quote;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

/// Bookkeeping table name
pub const SCHEMA_TABLE: &str = "entwine_schema";

const SCHEMA_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entwine_schema (
    name TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Table,
    JoinTable,
    Index,
}

impl StructureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::JoinTable => "join_table",
            Self::Index => "index",
        }
    }
}

/// One table or index derived from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub name: String,
    pub kind: StructureKind,
    pub sql: String,
}

/// Outcome of a materialize call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    /// Structures created by this call
    pub created: Vec<String>,
    /// Structures that already existed
    pub present: Vec<String>,
}

fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int | FieldType::Bool => "INTEGER",
        FieldType::Float => "REAL",
        // Time is fixed-width RFC 3339 text
        FieldType::String | FieldType::Time => "TEXT",
    }
}

fn entity_table(registry: &Registry, entity_type: &EntityType) -> Result<Vec<Structure>> {
    let table = entity_type.table_name();
    let mut defs = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(ID_FIELD))];

    for field in entity_type.fields() {
        let mut def = format!("{} {}", quote(field.name()), sql_type(field.field_type()));
        if !field.is_optional() {
            def.push_str(" NOT NULL");
        }
        if field.is_unique() {
            def.push_str(" UNIQUE");
        }
        defs.push(def);
    }

    let mut indexes = Vec::new();
    for fk in registry.foreign_keys(entity_type.name())? {
        defs.push(format!(
            "{} INTEGER{} REFERENCES {}({}) ON DELETE SET NULL",
            quote(&fk.column),
            if fk.unique { " UNIQUE" } else { "" },
            quote(&fk.references),
            quote(ID_FIELD)
        ));
        if !fk.unique {
            indexes.push(index(&table, &fk.column));
        }
    }

    let mut structures = vec![Structure {
        name: table.clone(),
        kind: StructureKind::Table,
        sql: format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote(&table),
            defs.join(",\n    ")
        ),
    }];
    structures.extend(indexes);
    Ok(structures)
}

fn index(table: &str, column: &str) -> Structure {
    let name = format!("{}_{}", table, column);
    Structure {
        sql: format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            quote(&name),
            quote(table),
            quote(column)
        ),
        name,
        kind: StructureKind::Index,
    }
}

/// Every structure the registry needs, tables before join tables
pub fn plan(registry: &Registry) -> Result<Vec<Structure>> {
    let mut structures = Vec::new();
    for entity_type in registry.types() {
        structures.extend(entity_table(registry, entity_type)?);
    }

    for jt in registry.join_tables()? {
        structures.push(Structure {
            name: jt.table.clone(),
            kind: StructureKind::JoinTable,
            sql: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 {left} INTEGER NOT NULL REFERENCES {left_table}({id}) ON DELETE CASCADE,\n    \
                 {right} INTEGER NOT NULL REFERENCES {right_table}({id}) ON DELETE CASCADE,\n    \
                 PRIMARY KEY ({left}, {right})\n)",
                table = quote(&jt.table),
                left = quote(&jt.left_column),
                left_table = quote(&jt.left_table),
                right = quote(&jt.right_column),
                right_table = quote(&jt.right_table),
                id = quote(ID_FIELD),
            ),
        });
        // The primary key already covers lookups by the left column
        structures.push(index(&jt.table, &jt.right_column));
    }

    debug!(structures = structures.len(), "Planned schema");
    Ok(structures)
}

/// The statements `materialize` would run, for inspection
pub fn ddl(registry: &Registry) -> Result<Vec<String>> {
    Ok(plan(registry)?.into_iter().map(|s| s.sql).collect())
}

/// Create every missing structure in one transaction
pub fn materialize(
    conn: &mut Connection,
    structures: &[Structure],
    guard: &Context,
) -> SqliteResult<MaterializeReport> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_TABLE_SQL)?;

    let applied_at = format_time(&Utc::now());
    let mut report = MaterializeReport::default();

    for structure in structures {
        let exists: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = ?1)",
            [&structure.name],
            |row| row.get(0),
        )?;

        if exists {
            report.present.push(structure.name.clone());
        } else {
            tx.execute_batch(&structure.sql).map_err(|e| {
                SqliteError::Schema(format!("Failed to create {}: {}", structure.name, e))
            })?;
            info!(
                name = %structure.name,
                kind = structure.kind.as_str(),
                "Created structure"
            );
            report.created.push(structure.name.clone());
        }

        tx.execute(
            "INSERT OR IGNORE INTO entwine_schema (name, kind, applied_at) VALUES (?1, ?2, ?3)",
            params![structure.name, structure.kind.as_str(), applied_at],
        )?;
    }

    if guard.is_done() {
        return Err(SqliteError::Interrupted);
    }
    tx.commit()?;

    info!(
        created = report.created.len(),
        present = report.present.len(),
        "Schema materialized"
    );
    Ok(report)
}
