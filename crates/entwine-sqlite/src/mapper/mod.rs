//! Relational mapper: builder-style create, update and delete.
//!
//! Builders only stage changes; the terminal `save`/`exec` call validates
//! them and writes the row plus its edge rows in one transaction.

mod create;
mod delete;
mod update;

pub use create::Create;
pub use delete::{Delete, DeleteOne};
pub use update::{Update, UpdateOne};

use crate::error::{SqliteError, SqliteResult};
use crate::row::{placeholders, read_entity, to_sql};
use entwine_core::schema::{EdgeStorage, Relation, ID_FIELD};
use entwine_core::{Entity, Error, Operation, Registry, Result, Value};
use entwine_query::quote;
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

/// Ids bound per `IN (...)` list, well under SQLite's variable limit
pub(crate) const ID_CHUNK: usize = 500;

/// Staged edge change, applied after the owning row is written
#[derive(Debug, Clone)]
pub(crate) enum EdgeOp {
    Add(Relation, Vec<i64>),
    Remove(Relation, Vec<i64>),
    Clear(Relation),
}

/// Resolve `edge` and check that every target instance has its target type
pub(crate) fn target_ids(
    registry: &Registry,
    entity: &str,
    edge: &str,
    targets: &[&Entity],
) -> Result<(Relation, Vec<i64>)> {
    let relation = registry.edge(entity, edge)?;
    let mut ids = Vec::with_capacity(targets.len());
    for target in targets {
        if target.entity_type() != relation.target {
            return Err(Error::TypeMismatch {
                entity: entity.to_string(),
                field: edge.to_string(),
                expected: relation.target.clone(),
                found: target.entity_type().to_string(),
            });
        }
        ids.push(target.id());
    }
    Ok((relation, ids))
}

/// Unique edges hold at most one instance
pub(crate) fn check_cardinality(relation: &Relation, count: usize) -> Result<()> {
    if relation.cardinality.is_unique() && count > 1 {
        return Err(Error::EdgeCardinality {
            entity: relation.owner.clone(),
            edge: relation.name.clone(),
        });
    }
    Ok(())
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Fail unless every id names an existing row of the edge's target type
pub(crate) fn ensure_targets_exist(
    conn: &Connection,
    op: Operation,
    relation: &Relation,
    ids: &[i64],
) -> SqliteResult<()> {
    let ids = dedup(ids);
    if ids.is_empty() {
        return Ok(());
    }
    let mut found = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} IN ({})",
            quote(&relation.target_table),
            quote(ID_FIELD),
            placeholders(chunk.len())
        );
        let n: i64 = conn.query_row(&sql, params_from_iter(chunk.iter()), |row| row.get(0))?;
        found += n as usize;
    }
    if found != ids.len() {
        return Err(Error::ConstraintViolation {
            op,
            entity: relation.owner.clone(),
            message: format!(
                "edge {} references a {} that does not exist",
                relation.name, relation.target
            ),
        }
        .into());
    }
    Ok(())
}

/// Write relationship rows from `owner_id` to each of `ids`.
///
/// A one-to-many target that already belongs to another owner is a
/// constraint violation rather than being moved silently.
pub(crate) fn link(
    conn: &Connection,
    op: Operation,
    relation: &Relation,
    owner_id: i64,
    ids: &[i64],
) -> SqliteResult<()> {
    ensure_targets_exist(conn, op, relation, ids)?;

    match &relation.storage {
        EdgeStorage::TargetColumn { column } => {
            let sql = format!(
                "UPDATE {table} SET {col} = ?1 WHERE {id} = ?2 AND ({col} IS NULL OR {col} = ?1)",
                table = quote(&relation.target_table),
                col = quote(column),
                id = quote(ID_FIELD),
            );
            for target in dedup(ids) {
                if conn.execute(&sql, params![owner_id, target])? == 0 {
                    return Err(Error::ConstraintViolation {
                        op,
                        entity: relation.owner.clone(),
                        message: format!(
                            "{} {} is already linked over {} to another {}",
                            relation.target, target, relation.name, relation.owner
                        ),
                    }
                    .into());
                }
            }
        }
        EdgeStorage::OwnerColumn { column } => {
            if let Some(target) = ids.first() {
                let sql = format!(
                    "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                    quote(&relation.owner_table),
                    quote(column),
                    quote(ID_FIELD)
                );
                conn.execute(&sql, params![target, owner_id])?;
            }
        }
        EdgeStorage::JoinTable {
            table,
            owner_column,
            target_column,
        } => {
            let sql = format!(
                "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                quote(table),
                quote(owner_column),
                quote(target_column)
            );
            for target in dedup(ids) {
                conn.execute(&sql, params![owner_id, target])?;
            }
        }
    }

    debug!(
        entity = %relation.owner,
        edge = %relation.name,
        owner_id,
        targets = ids.len(),
        "Linked edge"
    );
    Ok(())
}

/// Remove relationship rows from `owner_id`; `None` removes all of them
pub(crate) fn unlink(
    conn: &Connection,
    relation: &Relation,
    owner_id: i64,
    ids: Option<&[i64]>,
) -> SqliteResult<usize> {
    // Every statement ends in `WHERE <owner> = ?`; id filters append to it
    let (head, filter_col) = match &relation.storage {
        EdgeStorage::TargetColumn { column } => (
            format!(
                "UPDATE {table} SET {col} = NULL WHERE {col} = ?",
                table = quote(&relation.target_table),
                col = quote(column),
            ),
            quote(ID_FIELD),
        ),
        EdgeStorage::OwnerColumn { column } => (
            format!(
                "UPDATE {} SET {} = NULL WHERE {} = ?",
                quote(&relation.owner_table),
                quote(column),
                quote(ID_FIELD)
            ),
            quote(column),
        ),
        EdgeStorage::JoinTable {
            table,
            owner_column,
            target_column,
        } => (
            format!(
                "DELETE FROM {} WHERE {} = ?",
                quote(table),
                quote(owner_column)
            ),
            quote(target_column),
        ),
    };

    let Some(ids) = ids else {
        return Ok(conn.execute(&head, [owner_id])?);
    };
    let mut removed = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let sql = format!("{} AND {} IN ({})", head, filter_col, placeholders(chunk.len()));
        let args = std::iter::once(owner_id).chain(chunk.iter().copied());
        removed += conn.execute(&sql, params_from_iter(args))?;
    }
    Ok(removed)
}

/// Insert a row, returning its assigned id
pub(crate) fn insert_row(
    conn: &Connection,
    table: &str,
    columns: &[(String, Value)],
) -> SqliteResult<i64> {
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote(table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            columns
                .iter()
                .map(|(name, _)| quote(name))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders(columns.len())
        )
    };
    debug!(sql = %sql, params = columns.len(), "Executing insert");
    conn.execute(&sql, params_from_iter(columns.iter().map(|(_, v)| to_sql(v))))?;
    Ok(conn.last_insert_rowid())
}

/// Read one row by id
pub(crate) fn load(
    conn: &Connection,
    registry: &Registry,
    entity: &str,
    id: i64,
) -> SqliteResult<Option<Entity>> {
    let entity_type = registry.resolve(entity)?;
    let columns = registry.columns(entity)?;
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        columns
            .iter()
            .map(|c| quote(&c.name))
            .collect::<Vec<_>>()
            .join(", "),
        quote(&entity_type.table_name()),
        quote(ID_FIELD)
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_entity(row, entity, &columns)?)),
        None => Ok(None),
    }
}

/// Clear every relationship that points at the rows about to be deleted.
///
/// Equivalent to the `ON DELETE` actions, but independent of
/// `PRAGMA foreign_keys`.
pub(crate) fn detach(
    conn: &Connection,
    registry: &Registry,
    entity: &str,
    ids: &[i64],
) -> SqliteResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let entity_type = registry.resolve(entity)?;
    for edge in entity_type.edges() {
        let relation = registry.edge(entity, edge.name())?;
        for chunk in ids.chunks(ID_CHUNK) {
            let sql = match &relation.storage {
                // Held on our own row; goes away with it
                EdgeStorage::OwnerColumn { .. } => break,
                EdgeStorage::TargetColumn { column } => format!(
                    "UPDATE {table} SET {col} = NULL WHERE {col} IN ({list})",
                    table = quote(&relation.target_table),
                    col = quote(column),
                    list = placeholders(chunk.len()),
                ),
                EdgeStorage::JoinTable {
                    table,
                    owner_column,
                    ..
                } => format!(
                    "DELETE FROM {} WHERE {} IN ({})",
                    quote(table),
                    quote(owner_column),
                    placeholders(chunk.len())
                ),
            };
            conn.execute(&sql, params_from_iter(chunk.iter()))?;
        }
    }
    Ok(())
}

/// Domain failure raised while holding the connection
pub(crate) fn not_found(entity: &str) -> SqliteError {
    Error::NotFound {
        entity: entity.to_string(),
    }
    .into()
}
