//! Entity registry: the set of declared types and their resolved relations

use super::edge::{Cardinality, EdgeKind, EdgeStorage, Relation};
use super::entity_type::{snake_case, EntityType, ID_FIELD};
use super::field::Field;
use crate::error::{Error, Result};
use crate::value::FieldType;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Physical column of an entity table, in select order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Field(FieldType),
    /// FK held on this row for the named edge
    ForeignKey { edge: String },
}

/// FK column held on an entity table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    /// Edge name from the holding type's perspective
    pub edge: String,
    pub references: String,
    pub unique: bool,
}

/// Join table backing a many-to-many relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub table: String,
    pub left_column: String,
    pub left_table: String,
    pub right_column: String,
    pub right_table: String,
}

/// Holds every entity type definition.
///
/// Mutable while types are being defined; shared read-only (`Arc`) once a
/// client is opened on it.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: Vec<EntityType>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type.
    ///
    /// Fails with `SchemaConflict` when the type or its table is already
    /// defined, or when a field/edge name repeats or shadows `id`.
    pub fn define(&mut self, entity_type: EntityType) -> Result<()> {
        let name = entity_type.name().to_string();
        let conflict = |what: &str| Error::SchemaConflict {
            entity: name.clone(),
            name: what.to_string(),
        };

        if self.index.contains_key(&name) {
            return Err(conflict(&name));
        }
        let table = entity_type.table_name();
        if self.types.iter().any(|t| t.table_name() == table) {
            return Err(conflict(&table));
        }

        let mut seen = HashSet::from([ID_FIELD.to_string()]);
        let field_names = entity_type.fields().iter().map(Field::name);
        let edge_names = entity_type.edges().iter().map(|e| e.name());
        for member in field_names.chain(edge_names) {
            if !seen.insert(member.to_string()) {
                return Err(conflict(member));
            }
        }

        for field in entity_type.fields() {
            field.check_default(&name)?;
        }

        for edge in entity_type.edges() {
            match (edge.kind(), edge.reference_name()) {
                (EdgeKind::Inverse, None) => {
                    return Err(Error::schema(
                        &name,
                        format!("inverse edge {} has no reference", edge.name()),
                    ))
                }
                (EdgeKind::Assoc, Some(_)) => {
                    return Err(Error::schema(
                        &name,
                        format!("association edge {} cannot reference another edge", edge.name()),
                    ))
                }
                _ => {}
            }
        }

        debug!(
            entity = %name,
            fields = entity_type.fields().len(),
            edges = entity_type.edges().len(),
            "Defined entity type"
        );
        self.index.insert(name, self.types.len());
        self.types.push(entity_type);
        Ok(())
    }

    /// Look up a type by name
    pub fn resolve(&self, name: &str) -> Result<&EntityType> {
        self.index
            .get(name)
            .map(|&i| &self.types[i])
            .ok_or_else(|| Error::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn types(&self) -> impl Iterator<Item = &EntityType> {
        self.types.iter()
    }

    pub fn field(&self, entity: &str, name: &str) -> Result<&Field> {
        self.resolve(entity)?
            .get_field(name)
            .ok_or_else(|| Error::unknown_field(entity, name))
    }

    /// Resolve an edge into cardinality, inverse and storage
    pub fn edge(&self, entity: &str, name: &str) -> Result<Relation> {
        let owner = self.resolve(entity)?;
        let decl = owner
            .get_edge(name)
            .ok_or_else(|| Error::unknown_edge(entity, name))?;
        let target = self.resolve(decl.target()).map_err(|_| {
            Error::schema(
                entity,
                format!("edge {} targets undefined type {}", name, decl.target()),
            )
        })?;

        // Normalize to (association owner, association, inverse)
        let (assoc_owner, assoc_target, assoc, inverse) = match decl.kind() {
            EdgeKind::Assoc => {
                let inverse = self.inverse_of(owner, decl.name(), target)?;
                (owner, target, decl, inverse)
            }
            EdgeKind::Inverse => {
                let reference = decl.reference_name().unwrap_or_default();
                let assoc = target
                    .get_edge(reference)
                    .filter(|e| e.kind() == EdgeKind::Assoc && e.target() == owner.name())
                    .ok_or_else(|| {
                        Error::schema(
                            entity,
                            format!(
                                "edge {} references {}.{}, which is not an edge to {}",
                                name,
                                target.name(),
                                reference,
                                owner.name()
                            ),
                        )
                    })?;
                (target, owner, assoc, decl)
            }
        };

        let prefix = snake_case(assoc_owner.name());
        let column = format!("{}_{}", prefix, assoc.name());
        let (cardinality, storage) = match (assoc.is_unique(), inverse.is_unique()) {
            (false, false) => {
                let target_column = if assoc_owner.name() == assoc_target.name() {
                    format!("{}_id", assoc.name())
                } else {
                    format!("{}_id", snake_case(assoc_target.name()))
                };
                (
                    Cardinality::ManyToMany,
                    EdgeStorage::JoinTable {
                        table: format!("{}_{}", prefix, assoc.name()),
                        owner_column: format!("{}_id", prefix),
                        target_column,
                    },
                )
            }
            (false, true) => (Cardinality::OneToMany, EdgeStorage::TargetColumn { column }),
            (true, false) => (Cardinality::ManyToOne, EdgeStorage::OwnerColumn { column }),
            (true, true) => (Cardinality::OneToOne, EdgeStorage::TargetColumn { column }),
        };

        let (cardinality, storage, inverse_name) = match decl.kind() {
            EdgeKind::Assoc => (cardinality, storage, inverse.name()),
            EdgeKind::Inverse => (cardinality.mirror(), storage.mirror(), assoc.name()),
        };

        Ok(Relation {
            owner: owner.name().to_string(),
            name: decl.name().to_string(),
            target: target.name().to_string(),
            inverse: inverse_name.to_string(),
            cardinality,
            storage,
            owner_table: owner.table_name(),
            target_table: target.table_name(),
        })
    }

    fn inverse_of<'a>(
        &'a self,
        owner: &EntityType,
        assoc: &str,
        target: &'a EntityType,
    ) -> Result<&'a super::edge::Edge> {
        let mut inverses = target.edges().iter().filter(|e| {
            e.kind() == EdgeKind::Inverse
                && e.target() == owner.name()
                && e.reference_name() == Some(assoc)
        });
        match (inverses.next(), inverses.next()) {
            (Some(inverse), None) => Ok(inverse),
            (None, _) => Err(Error::schema(
                owner.name(),
                format!("edge {} has no inverse on {}", assoc, target.name()),
            )),
            (Some(_), Some(_)) => Err(Error::schema(
                owner.name(),
                format!("edge {} has several inverses on {}", assoc, target.name()),
            )),
        }
    }

    /// Check that every edge resolves to a well-defined inverse
    pub fn validate(&self) -> Result<()> {
        for entity_type in &self.types {
            for edge in entity_type.edges() {
                self.edge(entity_type.name(), edge.name())?;
            }
        }
        Ok(())
    }

    /// FK columns stored on the table of `entity`
    pub fn foreign_keys(&self, entity: &str) -> Result<Vec<ForeignKey>> {
        let entity_type = self.resolve(entity)?;
        let mut keys = Vec::new();
        for edge in entity_type.edges() {
            let relation = self.edge(entity, edge.name())?;
            if let EdgeStorage::OwnerColumn { column } = &relation.storage {
                keys.push(ForeignKey {
                    column: column.clone(),
                    edge: relation.name.clone(),
                    references: relation.target_table.clone(),
                    unique: relation.is_one_to_one(),
                });
            }
        }
        Ok(keys)
    }

    /// Join tables for every many-to-many relationship, once each
    pub fn join_tables(&self) -> Result<Vec<JoinTable>> {
        let mut tables = Vec::new();
        for entity_type in &self.types {
            for edge in entity_type.edges() {
                if edge.kind() != EdgeKind::Assoc {
                    continue;
                }
                let relation = self.edge(entity_type.name(), edge.name())?;
                if let EdgeStorage::JoinTable {
                    table,
                    owner_column,
                    target_column,
                } = relation.storage
                {
                    tables.push(JoinTable {
                        table,
                        left_column: owner_column,
                        left_table: relation.owner_table,
                        right_column: target_column,
                        right_table: relation.target_table,
                    });
                }
            }
        }
        Ok(tables)
    }

    /// Column layout of an entity table: id, declared fields, held FKs
    pub fn columns(&self, entity: &str) -> Result<Vec<Column>> {
        let entity_type = self.resolve(entity)?;
        let mut columns = vec![Column {
            name: ID_FIELD.to_string(),
            kind: ColumnKind::Id,
        }];
        columns.extend(entity_type.fields().iter().map(|f| Column {
            name: f.name().to_string(),
            kind: ColumnKind::Field(f.field_type()),
        }));
        columns.extend(self.foreign_keys(entity)?.into_iter().map(|fk| Column {
            name: fk.column,
            kind: ColumnKind::ForeignKey { edge: fk.edge },
        }));
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Edge, Field};

    fn demo() -> Registry {
        let mut registry = Registry::new();
        registry
            .define(
                EntityType::new("User")
                    .field(Field::int("age").positive())
                    .field(Field::string("name").default("unknown"))
                    .edge(Edge::to("cars", "Car"))
                    .edge(Edge::from("groups", "Group").reference("users")),
            )
            .unwrap();
        registry
            .define(
                EntityType::new("Car")
                    .field(Field::string("model"))
                    .field(Field::time("registered_at"))
                    .edge(Edge::from("owner", "User").reference("cars").unique()),
            )
            .unwrap();
        registry
            .define(
                EntityType::new("Group")
                    .field(Field::string("name"))
                    .edge(Edge::to("users", "User")),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_define_rejects_unstorable_defaults() {
        let mut registry = demo();

        let err = registry
            .define(EntityType::new("Pet").field(Field::int("legs").default("four")))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }), "{}", err);

        let err = registry
            .define(EntityType::new("Pet").field(Field::string("born").default_now()))
            .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }), "{}", err);

        // A rejected type leaves the name free
        registry
            .define(
                EntityType::new("Pet")
                    .field(Field::int("legs").default(4))
                    .field(Field::time("born").default_now()),
            )
            .unwrap();
        assert!(registry.resolve("Pet").is_ok());
    }

    #[test]
    fn test_define_conflicts() {
        let mut registry = demo();

        let err = registry.define(EntityType::new("User")).unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { .. }));

        let err = registry
            .define(
                EntityType::new("Pet")
                    .field(Field::string("name"))
                    .field(Field::int("name")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { ref name, .. } if name == "name"));

        let err = registry
            .define(EntityType::new("Pet").field(Field::int("id")))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { ref name, .. } if name == "id"));

        let err = registry
            .define(EntityType::new("Team").table("groups"))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { ref name, .. } if name == "groups"));

        let err = registry
            .define(
                EntityType::new("Pet")
                    .field(Field::string("owner"))
                    .edge(Edge::from("owner", "User").reference("pets")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { .. }));
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = demo();
        assert!(registry.resolve("Car").is_ok());
        assert!(matches!(
            registry.resolve("Boat"),
            Err(Error::UnknownType { .. })
        ));
        assert!(matches!(
            registry.field("Car", "color"),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            registry.edge("Car", "driver"),
            Err(Error::UnknownEdge { .. })
        ));
    }

    #[test]
    fn test_one_to_many_both_sides() {
        let registry = demo();

        let cars = registry.edge("User", "cars").unwrap();
        assert_eq!(cars.cardinality, Cardinality::OneToMany);
        assert_eq!(cars.inverse, "owner");
        assert_eq!(
            cars.storage,
            EdgeStorage::TargetColumn {
                column: "user_cars".to_string()
            }
        );

        let owner = registry.edge("Car", "owner").unwrap();
        assert_eq!(owner.cardinality, Cardinality::ManyToOne);
        assert_eq!(owner.inverse, "cars");
        assert_eq!(owner.target_table, "users");
        assert_eq!(
            owner.storage,
            EdgeStorage::OwnerColumn {
                column: "user_cars".to_string()
            }
        );
    }

    #[test]
    fn test_many_to_many_both_sides() {
        let registry = demo();

        let users = registry.edge("Group", "users").unwrap();
        assert_eq!(users.cardinality, Cardinality::ManyToMany);
        assert_eq!(
            users.storage,
            EdgeStorage::JoinTable {
                table: "group_users".to_string(),
                owner_column: "group_id".to_string(),
                target_column: "user_id".to_string(),
            }
        );

        let groups = registry.edge("User", "groups").unwrap();
        assert_eq!(groups.inverse, "users");
        assert_eq!(
            groups.storage,
            EdgeStorage::JoinTable {
                table: "group_users".to_string(),
                owner_column: "user_id".to_string(),
                target_column: "group_id".to_string(),
            }
        );

        let tables = registry.join_tables().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].left_table, "groups");
        assert_eq!(tables[0].right_table, "users");
    }

    #[test]
    fn test_one_to_one_and_self_reference() {
        let mut registry = Registry::new();
        registry
            .define(
                EntityType::new("Person")
                    .field(Field::string("name"))
                    .edge(Edge::to("spouse_of", "Person").unique())
                    .edge(Edge::from("spouse", "Person").reference("spouse_of").unique())
                    .edge(Edge::to("friends", "Person"))
                    .edge(Edge::from("friend_of", "Person").reference("friends")),
            )
            .unwrap();
        registry.validate().unwrap();

        let spouse = registry.edge("Person", "spouse").unwrap();
        assert_eq!(spouse.cardinality, Cardinality::OneToOne);
        let keys = registry.foreign_keys("Person").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].column, "person_spouse_of");
        assert!(keys[0].unique);

        let friends = registry.edge("Person", "friends").unwrap();
        assert_eq!(
            friends.storage,
            EdgeStorage::JoinTable {
                table: "person_friends".to_string(),
                owner_column: "person_id".to_string(),
                target_column: "friends_id".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_requires_inverse() {
        let mut registry = Registry::new();
        registry
            .define(EntityType::new("User").edge(Edge::to("pets", "Pet")))
            .unwrap();
        registry.define(EntityType::new("Pet")).unwrap();

        let err = registry.validate().unwrap_err();
        assert!(matches!(err, Error::Schema { ref reason, .. } if reason.contains("no inverse")));
    }

    #[test]
    fn test_validate_rejects_dangling_reference() {
        let mut registry = Registry::new();
        registry.define(EntityType::new("User")).unwrap();
        registry
            .define(EntityType::new("Pet").edge(Edge::from("owner", "User").reference("pets")))
            .unwrap();

        assert!(matches!(registry.validate(), Err(Error::Schema { .. })));
    }

    #[test]
    fn test_inverse_without_reference_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .define(EntityType::new("Pet").edge(Edge::from("owner", "User")))
            .unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_columns_layout() {
        let registry = demo();
        registry.validate().unwrap();

        let names: Vec<_> = registry
            .columns("Car")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["id", "model", "registered_at", "user_cars"]);

        let user_columns = registry.columns("User").unwrap();
        assert_eq!(user_columns.len(), 3);
        assert_eq!(user_columns[1].kind, ColumnKind::Field(FieldType::Int));
    }
}
