//! Field declarations

use crate::error::{Error, Result};
use crate::value::{FieldType, Value};
use chrono::Utc;
use regex::Regex;

/// Check run against a field value before it is written
#[derive(Debug, Clone)]
pub enum Validator {
    /// Numeric value must be greater than zero
    Positive,
    NonNegative,
    /// Inclusive numeric range
    Range { min: f64, max: f64 },
    /// String must not be empty
    NotEmpty,
    /// String length in characters
    MaxLen(usize),
    Matches(Regex),
}

impl Validator {
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            Self::Positive => match value.as_float() {
                Some(n) if n > 0.0 => Ok(()),
                _ => Err(format!("value {} is not positive", value)),
            },
            Self::NonNegative => match value.as_float() {
                Some(n) if n >= 0.0 => Ok(()),
                _ => Err(format!("value {} is negative", value)),
            },
            Self::Range { min, max } => match value.as_float() {
                Some(n) if n >= *min && n <= *max => Ok(()),
                _ => Err(format!("value {} is out of range [{}, {}]", value, min, max)),
            },
            Self::NotEmpty => match value.as_str() {
                Some(s) if !s.is_empty() => Ok(()),
                _ => Err("value is empty".to_string()),
            },
            Self::MaxLen(max) => match value.as_str() {
                Some(s) if s.chars().count() <= *max => Ok(()),
                _ => Err(format!("value exceeds {} characters", max)),
            },
            Self::Matches(re) => match value.as_str() {
                Some(s) if re.is_match(s) => Ok(()),
                _ => Err(format!("value {:?} does not match {}", value.to_string(), re)),
            },
        }
    }
}

#[derive(Debug, Clone)]
enum DefaultValue {
    Value(Value),
    Now,
}

/// A typed column of an entity type
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    field_type: FieldType,
    optional: bool,
    unique: bool,
    immutable: bool,
    default: Option<DefaultValue>,
    validators: Vec<Validator>,
}

impl Field {
    fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: false,
            unique: false,
            immutable: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Time)
    }

    /// Nullable column, not required on create
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Settable on create only
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Default a time field to the moment the create builder is made
    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultValue::Now);
        self
    }

    pub fn positive(self) -> Self {
        self.validate(Validator::Positive)
    }

    pub fn non_negative(self) -> Self {
        self.validate(Validator::NonNegative)
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.validate(Validator::Range { min, max })
    }

    pub fn not_empty(self) -> Self {
        self.validate(Validator::NotEmpty)
    }

    pub fn max_len(self, max: usize) -> Self {
        self.validate(Validator::MaxLen(max))
    }

    pub fn matches(self, pattern: Regex) -> Self {
        self.validate(Validator::Matches(pattern))
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Value a fresh create builder starts with, if any
    pub fn default_value(&self) -> Option<Value> {
        match &self.default {
            Some(DefaultValue::Value(v)) => {
                Some(self.field_type.coerce(v.clone()).unwrap_or_else(|| v.clone()))
            }
            Some(DefaultValue::Now) => Some(Value::Time(Utc::now())),
            None => None,
        }
    }

    /// Reject a declared default that this field could never store
    pub fn check_default(&self, entity: &str) -> Result<()> {
        match &self.default {
            None => Ok(()),
            Some(DefaultValue::Now) if self.field_type == FieldType::Time => Ok(()),
            Some(DefaultValue::Now) => Err(Error::schema(
                entity,
                format!("default_now on {} field {}", self.field_type, self.name),
            )),
            Some(DefaultValue::Value(v)) => {
                let v = self.accept(entity, v.clone())?;
                self.check(entity, &v)
            }
        }
    }

    /// Type-check a value for this field, returning it in storage form.
    ///
    /// `Null` is accepted only on optional fields.
    pub fn accept(&self, entity: &str, value: Value) -> Result<Value> {
        let found = value.type_name();
        match self.field_type.coerce(value) {
            Some(Value::Null) if !self.optional => Err(self.mismatch(entity, found)),
            Some(v) => Ok(v),
            None => Err(self.mismatch(entity, found)),
        }
    }

    /// Run the declared validators. `Null` values skip validation.
    pub fn check(&self, entity: &str, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        for validator in &self.validators {
            validator.check(value).map_err(|reason| Error::Validation {
                entity: entity.to_string(),
                field: self.name.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    fn mismatch(&self, entity: &str, found: &str) -> Error {
        Error::TypeMismatch {
            entity: entity.to_string(),
            field: self.name.clone(),
            expected: self.field_type.name().to_string(),
            found: found.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_checks_type_and_nullability() {
        let age = Field::int("age");
        assert_eq!(age.accept("User", Value::Int(30)).unwrap(), Value::Int(30));
        assert!(matches!(
            age.accept("User", Value::from("thirty")),
            Err(Error::TypeMismatch { ref found, .. }) if found == "string"
        ));
        assert!(matches!(
            age.accept("User", Value::Null),
            Err(Error::TypeMismatch { ref found, .. }) if found == "null"
        ));

        let nickname = Field::string("nickname").optional();
        assert_eq!(nickname.accept("User", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_validators() {
        let age = Field::int("age").positive();
        assert!(age.check("User", &Value::Int(1)).is_ok());
        assert!(matches!(
            age.check("User", &Value::Int(0)),
            Err(Error::Validation { .. })
        ));

        let name = Field::string("name").matches(Regex::new("^[a-zA-Z_]+$").unwrap());
        assert!(name.check("Group", &Value::from("GitHub")).is_ok());
        assert!(name.check("Group", &Value::from("Git Hub")).is_err());

        let code = Field::string("code").not_empty().max_len(3);
        assert!(code.check("Car", &Value::from("")).is_err());
        assert!(code.check("Car", &Value::from("abcd")).is_err());
        assert!(code.check("Car", &Value::from("abc")).is_ok());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            Field::string("name").default("unknown").default_value(),
            Some(Value::from("unknown"))
        );
        assert!(matches!(
            Field::time("created_at").default_now().default_value(),
            Some(Value::Time(_))
        ));
        assert_eq!(Field::int("age").default_value(), None);
        assert_eq!(
            Field::float("weight").default(2).default_value(),
            Some(Value::Float(2.0))
        );
    }

    #[test]
    fn test_check_default() {
        assert!(Field::int("legs").default(4).check_default("Pet").is_ok());
        assert!(Field::time("born").default_now().check_default("Pet").is_ok());
        assert!(Field::int("legs").check_default("Pet").is_ok());

        assert!(matches!(
            Field::int("legs").default("four").check_default("Pet"),
            Err(Error::TypeMismatch { ref found, .. }) if found == "string"
        ));
        assert!(matches!(
            Field::string("born").default_now().check_default("Pet"),
            Err(Error::Schema { .. })
        ));
        assert!(matches!(
            Field::int("legs").positive().default(0).check_default("Pet"),
            Err(Error::Validation { .. })
        ));
    }
}
