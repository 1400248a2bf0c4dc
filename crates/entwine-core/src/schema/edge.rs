//! Relationship edges between entity types

/// Which side of a relationship an edge declaration is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Owning side, declared with [`Edge::to`]
    Assoc,
    /// Back-reference, declared with [`Edge::from`] and `reference`
    Inverse,
}

/// Edge declaration on an entity type
#[derive(Debug, Clone)]
pub struct Edge {
    name: String,
    target: String,
    kind: EdgeKind,
    reference: Option<String>,
    unique: bool,
}

impl Edge {
    /// Association edge from the declaring type to `target`
    pub fn to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: EdgeKind::Assoc,
            reference: None,
            unique: false,
        }
    }

    /// Inverse edge; must name the association on `target` with [`Edge::reference`]
    pub fn from(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: EdgeKind::Inverse,
            reference: None,
            unique: false,
        }
    }

    pub fn reference(mut self, assoc: impl Into<String>) -> Self {
        self.reference = Some(assoc.into());
        self
    }

    /// At most one related instance from this side
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn reference_name(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// Relationship cardinality seen from the edge owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// The owner relates to at most one target
    pub fn is_unique(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// The same relationship seen from the other side
    pub fn mirror(&self) -> Self {
        match self {
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            other => *other,
        }
    }
}

/// Where the rows of a relationship live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeStorage {
    /// FK column on the owner's table pointing at the target
    OwnerColumn { column: String },
    /// FK column on the target's table pointing back at the owner
    TargetColumn { column: String },
    /// Join table; `owner_column` references the owner, `target_column` the target
    JoinTable {
        table: String,
        owner_column: String,
        target_column: String,
    },
}

impl EdgeStorage {
    /// The same storage seen from the other side
    pub fn mirror(&self) -> Self {
        match self {
            Self::OwnerColumn { column } => Self::TargetColumn {
                column: column.clone(),
            },
            Self::TargetColumn { column } => Self::OwnerColumn {
                column: column.clone(),
            },
            Self::JoinTable {
                table,
                owner_column,
                target_column,
            } => Self::JoinTable {
                table: table.clone(),
                owner_column: target_column.clone(),
                target_column: owner_column.clone(),
            },
        }
    }
}

/// A resolved edge: declaration plus cardinality, inverse and storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub owner: String,
    pub name: String,
    pub target: String,
    pub inverse: String,
    pub cardinality: Cardinality,
    pub storage: EdgeStorage,
    pub owner_table: String,
    pub target_table: String,
}

impl Relation {
    /// Unique FK relations also carry a UNIQUE constraint on the column
    pub fn is_one_to_one(&self) -> bool {
        self.cardinality == Cardinality::OneToOne
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mirror_swaps_sides() {
        let jt = EdgeStorage::JoinTable {
            table: "group_users".into(),
            owner_column: "group_id".into(),
            target_column: "user_id".into(),
        };
        assert_eq!(
            jt.mirror(),
            EdgeStorage::JoinTable {
                table: "group_users".into(),
                owner_column: "user_id".into(),
                target_column: "group_id".into(),
            }
        );
        assert_eq!(jt.mirror().mirror(), jt);

        let fk = EdgeStorage::TargetColumn {
            column: "user_cars".into(),
        };
        assert!(matches!(fk.mirror(), EdgeStorage::OwnerColumn { .. }));
    }

    #[test]
    fn test_cardinality_mirror() {
        assert_eq!(Cardinality::OneToMany.mirror(), Cardinality::ManyToOne);
        assert_eq!(Cardinality::ManyToMany.mirror(), Cardinality::ManyToMany);
        assert!(Cardinality::ManyToOne.is_unique());
        assert!(!Cardinality::OneToMany.is_unique());
    }
}
