//! SQLite query renderer.
//!
//! Renders a descriptor to one SQLite statement:
//! - Inner JOINs for each traversal hop (two for join-table edges)
//! - `EXISTS` semi-joins for edge-existence predicates
//! - `DISTINCT` over the final type whenever hops can fan out
//! - Named parameter binding for every value

use crate::ir::{Direction, QueryDescriptor};
use crate::predicate::{CompareOp, MatchOp, Predicate};
use crate::render::{QueryRenderer, RenderedQuery, Selection};
use entwine_core::schema::{EdgeStorage, ID_FIELD};
use entwine_core::{Error, Registry, Result, Value};
use std::collections::HashMap;
use tracing::debug;

/// Quote an identifier for SQLite
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column(alias: &str, name: &str) -> String {
    format!("{}.{}", alias, quote(name))
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Parameters and subquery aliases allocated during one render
#[derive(Default)]
struct RenderState {
    params: HashMap<String, Value>,
    next_param: usize,
    next_alias: usize,
}

impl RenderState {
    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.next_param);
        self.next_param += 1;
        self.params.insert(name.clone(), value);
        format!(":{}", name)
    }

    fn alias(&mut self, prefix: &str) -> String {
        let alias = format!("{}{}", prefix, self.next_alias);
        self.next_alias += 1;
        alias
    }
}

/// SQLite renderer over a registry's table layout.
///
/// Main-chain aliases are `t0..tN` for entity tables and `j1..jN` for join
/// tables; subqueries use `s*` and `x*`.
pub struct SqliteRenderer<'a> {
    registry: &'a Registry,
}

impl<'a> SqliteRenderer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    fn render_predicate(
        &self,
        predicate: &Predicate,
        alias: &str,
        entity: &str,
        state: &mut RenderState,
    ) -> Result<String> {
        match predicate {
            Predicate::Compare { field, op, value } => {
                let col = column(alias, field);
                match (op, value) {
                    (CompareOp::Eq, Value::Null) => Ok(format!("{} IS NULL", col)),
                    (CompareOp::Ne, Value::Null) => Ok(format!("{} IS NOT NULL", col)),
                    (_, Value::Null) => Err(Error::InvalidPredicate {
                        entity: entity.to_string(),
                        reason: format!("cannot apply {} to {} and NULL", op.as_sql(), field),
                    }),
                    _ => {
                        let param = state.bind(value.clone());
                        Ok(format!("{} {} {}", col, op.as_sql(), param))
                    }
                }
            }
            Predicate::Match { field, op, pattern } => {
                let escaped = escape_like(pattern);
                let like = match op {
                    MatchOp::Contains => format!("%{}%", escaped),
                    MatchOp::HasPrefix => format!("{}%", escaped),
                    MatchOp::HasSuffix => format!("%{}", escaped),
                };
                let param = state.bind(Value::String(like));
                Ok(format!("{} LIKE {} ESCAPE '\\'", column(alias, field), param))
            }
            Predicate::In {
                field,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // x IN () is false, x NOT IN () is true
                    return Ok(if *negated { "1" } else { "0" }.to_string());
                }
                let params: Vec<String> = values.iter().map(|v| state.bind(v.clone())).collect();
                Ok(format!(
                    "{} {}IN ({})",
                    column(alias, field),
                    if *negated { "NOT " } else { "" },
                    params.join(", ")
                ))
            }
            Predicate::Null { field, negated } => Ok(format!(
                "{} IS {}NULL",
                column(alias, field),
                if *negated { "NOT " } else { "" }
            )),
            Predicate::HasEdge { edge, with } => {
                self.render_has_edge(edge, with, alias, entity, state)
            }
            Predicate::Not(inner) => Ok(format!(
                "NOT ({})",
                self.render_predicate(inner, alias, entity, state)?
            )),
            Predicate::And(ps) => self.render_group(ps, " AND ", "1", alias, entity, state),
            Predicate::Or(ps) => self.render_group(ps, " OR ", "0", alias, entity, state),
        }
    }

    fn render_group(
        &self,
        predicates: &[Predicate],
        joiner: &str,
        empty: &str,
        alias: &str,
        entity: &str,
        state: &mut RenderState,
    ) -> Result<String> {
        if predicates.is_empty() {
            return Ok(empty.to_string());
        }
        let parts = predicates
            .iter()
            .map(|p| self.render_predicate(p, alias, entity, state))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", parts.join(joiner)))
    }

    /// Edge existence as a semi-join so one-to-many edges never duplicate rows
    fn render_has_edge(
        &self,
        edge: &str,
        with: &[Predicate],
        alias: &str,
        entity: &str,
        state: &mut RenderState,
    ) -> Result<String> {
        let relation = self.registry.edge(entity, edge)?;
        let target = quote(&relation.target_table);
        let sub = state.alias("s");
        let mut conditions = Vec::new();

        let from = match &relation.storage {
            EdgeStorage::TargetColumn { column: fk } => {
                conditions.push(format!("{} = {}", column(&sub, fk), column(alias, ID_FIELD)));
                format!("{} AS {}", target, sub)
            }
            EdgeStorage::OwnerColumn { column: fk } => {
                if with.is_empty() {
                    return Ok(format!("{} IS NOT NULL", column(alias, fk)));
                }
                conditions.push(format!("{} = {}", column(&sub, ID_FIELD), column(alias, fk)));
                format!("{} AS {}", target, sub)
            }
            EdgeStorage::JoinTable {
                table,
                owner_column,
                target_column,
            } => {
                let link = state.alias("x");
                conditions.push(format!(
                    "{} = {}",
                    column(&link, owner_column),
                    column(alias, ID_FIELD)
                ));
                if with.is_empty() {
                    format!("{} AS {}", quote(table), link)
                } else {
                    format!(
                        "{} AS {} JOIN {} AS {} ON {} = {}",
                        quote(table),
                        link,
                        target,
                        sub,
                        column(&sub, ID_FIELD),
                        column(&link, target_column)
                    )
                }
            }
        };

        for p in with {
            conditions.push(self.render_predicate(p, &sub, &relation.target, state)?);
        }
        Ok(format!(
            "EXISTS (SELECT 1 FROM {} WHERE {})",
            from,
            conditions.join(" AND ")
        ))
    }

    /// FROM clause with one join per hop, plus the WHERE conditions
    fn render_chain(
        &self,
        ir: &QueryDescriptor,
        state: &mut RenderState,
    ) -> Result<(String, Vec<String>, String)> {
        let origin = self.registry.resolve(&ir.origin)?;
        let mut from = format!("{} AS t0", quote(&origin.table_name()));
        let mut conditions = Vec::new();
        for p in &ir.predicates {
            conditions.push(self.render_predicate(p, "t0", &ir.origin, state)?);
        }

        let mut prev = "t0".to_string();
        for (i, hop) in ir.hops.iter().enumerate() {
            let relation = self.registry.edge(&hop.from, &hop.edge)?;
            let next = format!("t{}", i + 1);
            let target = quote(&relation.target_table);

            let join = match &relation.storage {
                EdgeStorage::TargetColumn { column: fk } => format!(
                    "\nJOIN {} AS {} ON {} = {}",
                    target,
                    next,
                    column(&next, fk),
                    column(&prev, ID_FIELD)
                ),
                EdgeStorage::OwnerColumn { column: fk } => format!(
                    "\nJOIN {} AS {} ON {} = {}",
                    target,
                    next,
                    column(&next, ID_FIELD),
                    column(&prev, fk)
                ),
                EdgeStorage::JoinTable {
                    table,
                    owner_column,
                    target_column,
                } => {
                    let link = format!("j{}", i + 1);
                    format!(
                        "\nJOIN {} AS {} ON {} = {}\nJOIN {} AS {} ON {} = {}",
                        quote(table),
                        link,
                        column(&link, owner_column),
                        column(&prev, ID_FIELD),
                        target,
                        next,
                        column(&next, ID_FIELD),
                        column(&link, target_column)
                    )
                }
            };
            from.push_str(&join);

            for p in &hop.predicates {
                conditions.push(self.render_predicate(p, &next, &hop.target, state)?);
            }
            prev = next;
        }

        Ok((from, conditions, prev))
    }

    fn render_paging(&self, ir: &QueryDescriptor, alias: &str) -> String {
        let mut sql = String::new();
        if !ir.order.is_empty() {
            let terms: Vec<String> = ir
                .order
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        Direction::Asc => "ASC",
                        Direction::Desc => "DESC",
                    };
                    format!("{} {}", column(alias, &o.field), dir)
                })
                .collect();
            sql.push_str(&format!("\nORDER BY {}", terms.join(", ")));
        }
        match (ir.limit, ir.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!("\nLIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!("\nLIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!("\nLIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }
        sql
    }
}

impl QueryRenderer for SqliteRenderer<'_> {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn render(&self, ir: &QueryDescriptor, selection: Selection) -> Result<RenderedQuery> {
        let mut state = RenderState::default();
        let (from, conditions, last) = self.render_chain(ir, &mut state)?;
        let entity = ir.current_type().to_string();

        let distinct = if ir.hops.is_empty() { "" } else { "DISTINCT " };
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("\nWHERE {}", conditions.join("\n  AND "))
        };
        let id = column(&last, ID_FIELD);

        let (sql, columns) = match selection {
            Selection::Entities => {
                let columns = self.registry.columns(&entity)?;
                let select = columns
                    .iter()
                    .map(|c| column(&last, &c.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "SELECT {}{}\nFROM {}{}{}",
                    distinct,
                    select,
                    from,
                    where_clause,
                    self.render_paging(ir, &last)
                );
                (sql, columns)
            }
            Selection::Ids => {
                // Ordered columns ride along so DISTINCT may sort by them
                let mut select = vec![id.clone()];
                select.extend(ir.order.iter().map(|o| column(&last, &o.field)));
                let sql = format!(
                    "SELECT {}{}\nFROM {}{}{}",
                    distinct,
                    select.join(", "),
                    from,
                    where_clause,
                    self.render_paging(ir, &last)
                );
                (sql, Vec::new())
            }
            Selection::Count => (
                format!("SELECT COUNT(DISTINCT {})\nFROM {}{}", id, from, where_clause),
                Vec::new(),
            ),
            Selection::Exists => (
                format!("SELECT EXISTS (SELECT 1\nFROM {}{})", from, where_clause),
                Vec::new(),
            ),
        };

        debug!(
            renderer = self.name(),
            entity = %entity,
            hops = ir.hops.len(),
            params = state.params.len(),
            "Rendered query"
        );
        Ok(RenderedQuery {
            sql,
            params: state.params,
            entity,
            columns,
        })
    }
}
