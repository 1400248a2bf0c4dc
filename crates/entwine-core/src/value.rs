//! Field values and their semantic types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Semantic type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    String,
    Time,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Time => "time",
        }
    }

    /// Coerce a value into this type, or `None` if the types disagree.
    ///
    /// Integers widen into floats; nothing else converts. `Null` passes through
    /// unchanged and is checked against the field's optionality by the caller.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (Self::Int, v @ Value::Int(_)) => Some(v),
            (Self::Float, v @ Value::Float(_)) => Some(v),
            (Self::Float, Value::Int(i)) => Some(Value::Float(i as f64)),
            (Self::Bool, v @ Value::Bool(_)) => Some(v),
            (Self::String, v @ Value::String(_)) => Some(v),
            (Self::Time, v @ Value::Time(_)) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
}

impl Value {
    /// Semantic type of this value; `None` for `Null`
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(FieldType::Bool),
            Self::Int(_) => Some(FieldType::Int),
            Self::Float(_) => Some(FieldType::Float),
            Self::String(_) => Some(FieldType::String),
            Self::Time(_) => Some(FieldType::Time),
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        self.field_type().map(|t| t.name()).unwrap_or("null")
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }
}

/// Store representation of a timestamp.
///
/// Fixed width with microseconds and a `Z` suffix, so text order equals time
/// order and range predicates work on the stored column.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by [`format_time`] (any RFC 3339 text is accepted)
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Time(t) => f.write_str(&format_time(t)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::String(s) => serializer.serialize_str(s),
            Self::Time(t) => serializer.serialize_str(&format_time(t)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case(FieldType::Int, Value::Int(3) => true)]
    #[test_case(FieldType::Int, Value::from("3") => false)]
    #[test_case(FieldType::Float, Value::Int(3) => true)]
    #[test_case(FieldType::Bool, Value::Int(1) => false)]
    #[test_case(FieldType::Time, Value::Time(Utc::now()) => true)]
    #[test_case(FieldType::String, Value::Null => true)]
    fn test_coerce(ty: FieldType, value: Value) -> bool {
        ty.coerce(value).is_some()
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(FieldType::Float.coerce(Value::Int(2)), Some(Value::Float(2.0)));
    }

    #[test]
    fn test_time_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::microseconds(1500);

        let (a, b) = (format_time(&early), format_time(&late));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_time(&b).unwrap(), late);
    }

    #[test]
    fn test_serialize_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Int(30),
            Value::from("a8m"),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[30,"a8m",null]"#);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
