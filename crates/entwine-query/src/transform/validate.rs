//! Validation transform.
//!
//! Checks a descriptor against the registry before rendering: types, fields
//! and edges must exist and comparison values must match the field type.
//! Values are returned in storage form (ints widened for float fields).

use crate::ir::QueryDescriptor;
use crate::predicate::Predicate;
use crate::transform::QueryTransform;
use entwine_core::schema::ID_FIELD;
use entwine_core::{Error, FieldType, Registry, Result, Value};

/// Validation transform that checks the descriptor against a registry.
pub struct ValidateTransform<'a> {
    registry: &'a Registry,
}

impl<'a> ValidateTransform<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    fn field_type(&self, entity: &str, field: &str) -> Result<FieldType> {
        if field == ID_FIELD {
            return Ok(FieldType::Int);
        }
        Ok(self.registry.field(entity, field)?.field_type())
    }

    fn coerce(&self, entity: &str, field: &str, value: Value) -> Result<Value> {
        let expected = self.field_type(entity, field)?;
        let found = value.type_name();
        expected.coerce(value).ok_or_else(|| Error::TypeMismatch {
            entity: entity.to_string(),
            field: field.to_string(),
            expected: expected.name().to_string(),
            found: found.to_string(),
        })
    }

    fn predicates(&self, entity: &str, predicates: Vec<Predicate>) -> Result<Vec<Predicate>> {
        predicates
            .into_iter()
            .map(|p| self.predicate(entity, p))
            .collect()
    }

    fn predicate(&self, entity: &str, predicate: Predicate) -> Result<Predicate> {
        Ok(match predicate {
            Predicate::Compare { field, op, value } => {
                let value = self.coerce(entity, &field, value)?;
                Predicate::Compare { field, op, value }
            }
            Predicate::Match { field, op, pattern } => {
                let field_type = self.field_type(entity, &field)?;
                if field_type != FieldType::String {
                    return Err(Error::InvalidPredicate {
                        entity: entity.to_string(),
                        reason: format!(
                            "{:?} requires a string field, {} is {}",
                            op, field, field_type
                        ),
                    });
                }
                Predicate::Match { field, op, pattern }
            }
            Predicate::In {
                field,
                values,
                negated,
            } => {
                let values = values
                    .into_iter()
                    .map(|v| {
                        if v.is_null() {
                            return Err(Error::InvalidPredicate {
                                entity: entity.to_string(),
                                reason: format!("IN list on {} contains NULL", field),
                            });
                        }
                        self.coerce(entity, &field, v)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Predicate::In {
                    field,
                    values,
                    negated,
                }
            }
            Predicate::Null { field, negated } => {
                self.field_type(entity, &field)?;
                Predicate::Null { field, negated }
            }
            Predicate::HasEdge { edge, with } => {
                let relation = self.registry.edge(entity, &edge)?;
                let with = self.predicates(&relation.target, with)?;
                Predicate::HasEdge { edge, with }
            }
            Predicate::Not(inner) => Predicate::Not(Box::new(self.predicate(entity, *inner)?)),
            Predicate::And(ps) => Predicate::And(self.predicates(entity, ps)?),
            Predicate::Or(ps) => Predicate::Or(self.predicates(entity, ps)?),
        })
    }
}

impl QueryTransform for ValidateTransform<'_> {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn transform(&self, mut ir: QueryDescriptor) -> Result<QueryDescriptor> {
        self.registry.resolve(&ir.origin)?;
        ir.predicates = self.predicates(&ir.origin, std::mem::take(&mut ir.predicates))?;

        let mut current = ir.origin.clone();
        for hop in &mut ir.hops {
            if hop.from != current {
                return Err(Error::InvalidPredicate {
                    entity: current,
                    reason: format!("hop {} starts from {}", hop.edge, hop.from),
                });
            }
            let relation = self.registry.edge(&hop.from, &hop.edge)?;
            hop.target = relation.target;
            hop.predicates = self.predicates(&hop.target, std::mem::take(&mut hop.predicates))?;
            current = hop.target.clone();
        }

        for order in &ir.order {
            self.field_type(&current, &order.field)?;
        }
        Ok(ir)
    }
}
