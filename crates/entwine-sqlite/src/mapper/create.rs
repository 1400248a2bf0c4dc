//! Create builder

use super::{
    check_cardinality, ensure_targets_exist, insert_row, link, load, not_found, target_ids, EdgeOp,
};
use crate::client::Client;
use crate::error::SqliteError;
use entwine_core::schema::{EdgeStorage, EntityType, Relation};
use entwine_core::{Context, Entity, Error, Operation, Result, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for one new instance, pre-populated with field defaults
#[derive(Clone, Debug)]
pub struct Create {
    client: Client,
    entity_type: String,
    values: BTreeMap<String, Value>,
    edges: Vec<EdgeOp>,
}

impl Create {
    pub(crate) fn new(client: Client, entity_type: &EntityType) -> Self {
        let values = entity_type
            .fields()
            .iter()
            .filter_map(|f| f.default_value().map(|v| (f.name().to_string(), v)))
            .collect();
        Self {
            client,
            entity_type: entity_type.name().to_string(),
            values,
            edges: Vec::new(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Value currently staged for `field`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let value = self
            .client
            .registry()
            .field(&self.entity_type, field)?
            .accept(&self.entity_type, value.into())?;
        self.values.insert(field.to_string(), value);
        Ok(self)
    }

    /// Set `field` when `value` is `Some`, leave it untouched otherwise
    pub fn set_opt<V: Into<Value>>(self, field: &str, value: Option<V>) -> Result<Self> {
        match value {
            Some(value) => self.set(field, value),
            None => Ok(self),
        }
    }

    pub fn add_edge(self, edge: &str, targets: &[&Entity]) -> Result<Self> {
        let (relation, ids) = target_ids(self.client.registry(), &self.entity_type, edge, targets)?;
        self.stage(relation, ids)
    }

    pub fn add_edge_ids(self, edge: &str, ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        let relation = self.client.registry().edge(&self.entity_type, edge)?;
        self.stage(relation, ids.into_iter().collect())
    }

    /// Set the single instance of a unique edge
    pub fn set_edge(self, edge: &str, target: &Entity) -> Result<Self> {
        let (relation, ids) = target_ids(self.client.registry(), &self.entity_type, edge, &[target])?;
        self.replace(relation, ids)
    }

    pub fn set_edge_id(self, edge: &str, id: i64) -> Result<Self> {
        let relation = self.client.registry().edge(&self.entity_type, edge)?;
        self.replace(relation, vec![id])
    }

    fn staged_mut(&mut self, edge: &str) -> Option<&mut Vec<i64>> {
        self.edges.iter_mut().find_map(|op| match op {
            EdgeOp::Add(relation, ids) if relation.name == edge => Some(ids),
            _ => None,
        })
    }

    fn stage(mut self, relation: Relation, ids: Vec<i64>) -> Result<Self> {
        if ids.is_empty() {
            return Ok(self);
        }
        match self.staged_mut(&relation.name) {
            Some(staged) => {
                check_cardinality(&relation, staged.len() + ids.len())?;
                staged.extend(ids);
            }
            None => {
                check_cardinality(&relation, ids.len())?;
                self.edges.push(EdgeOp::Add(relation, ids));
            }
        }
        Ok(self)
    }

    fn replace(mut self, relation: Relation, ids: Vec<i64>) -> Result<Self> {
        if !relation.cardinality.is_unique() {
            return Err(Error::EdgeCardinality {
                entity: relation.owner.clone(),
                edge: relation.name.clone(),
            });
        }
        match self.staged_mut(&relation.name) {
            Some(staged) => *staged = ids,
            None => self.edges.push(EdgeOp::Add(relation, ids)),
        }
        Ok(self)
    }

    /// Validate, insert the row and write staged edges in one transaction
    pub async fn save(self, ctx: &Context) -> Result<Entity> {
        let registry = self.client.registry_arc();
        let entity_type = registry.resolve(&self.entity_type)?;

        let mut columns = Vec::new();
        for field in entity_type.fields() {
            match self.values.get(field.name()) {
                Some(value) => {
                    field.check(&self.entity_type, value)?;
                    columns.push((field.name().to_string(), value.clone()));
                }
                None if field.is_optional() => {}
                None => {
                    return Err(Error::MissingField {
                        entity: self.entity_type.clone(),
                        field: field.name().to_string(),
                    })
                }
            }
        }

        // FKs held on our own row go into the insert itself
        let mut deferred = Vec::new();
        let mut owned = Vec::new();
        for op in self.edges {
            if let EdgeOp::Add(relation, ids) = op {
                match (&relation.storage, ids.first()) {
                    (EdgeStorage::OwnerColumn { column }, Some(id)) => {
                        columns.push((column.clone(), Value::Int(*id)));
                        owned.push((relation, ids));
                    }
                    _ => deferred.push((relation, ids)),
                }
            }
        }

        let table = entity_type.table_name();
        let entity = self.entity_type.clone();
        let task_registry = Arc::clone(&registry);
        self.client
            .pool()
            .run(ctx, Operation::Create, &self.entity_type, move |conn, guard| {
                let tx = conn.transaction()?;
                for (relation, ids) in &owned {
                    ensure_targets_exist(&tx, Operation::Create, relation, ids)?;
                }
                let id = insert_row(&tx, &table, &columns)?;
                for (relation, ids) in &deferred {
                    link(&tx, Operation::Create, relation, id, ids)?;
                }
                let created = load(&tx, &task_registry, &entity, id)?.ok_or_else(|| not_found(&entity))?;

                if guard.is_done() {
                    return Err(SqliteError::Interrupted);
                }
                tx.commit()?;
                Ok(created)
            })
            .await
    }

    /// `save` with the result discarded
    pub async fn exec(self, ctx: &Context) -> Result<()> {
        self.save(ctx).await.map(|_| ())
    }
}
