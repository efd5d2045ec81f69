//! Dynamic field values used by generic search and filtering

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            FieldValue::String(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a JSON scalar into a field value.
    ///
    /// Arrays and objects have no scalar form and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(FieldValue::Null),
            serde_json::Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FieldValue::Integer(i)),
                None => n.as_f64().map(FieldValue::Float),
            },
            serde_json::Value::String(s) => Some(FieldValue::String(s.clone())),
            _ => None,
        }
    }

    /// Compare against a raw query-string value.
    ///
    /// Strings compare case-sensitively, numbers and booleans are parsed
    /// from `raw` first. `Null` never matches.
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            FieldValue::String(s) => s == raw,
            FieldValue::Integer(i) => raw.parse::<i64>().is_ok_and(|v| v == *i),
            FieldValue::Float(f) => raw
                .parse::<f64>()
                .is_ok_and(|v| (v - f).abs() < f64::EPSILON),
            FieldValue::Boolean(b) => raw.parse::<bool>().is_ok_and(|v| v == *b),
            FieldValue::Uuid(u) => Uuid::parse_str(raw).is_ok_and(|v| v == *u),
            FieldValue::Date(d) => raw.parse::<NaiveDate>().is_ok_and(|v| v == *d),
            FieldValue::DateTime(dt) => dt.to_rfc3339() == raw,
            FieldValue::Null => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_matches_exactly() {
        let value = FieldValue::from("confirmed");
        assert!(value.matches("confirmed"));
        assert!(!value.matches("Confirmed"));
    }

    #[test]
    fn test_uuid_matches_textual_form() {
        let id = Uuid::new_v4();
        let value = FieldValue::from(id);
        assert!(value.matches(&id.to_string()));
        assert!(!value.matches("not-a-uuid"));
        assert_eq!(FieldValue::String(id.to_string()).as_uuid(), Some(id));
    }

    #[test]
    fn test_numbers_and_booleans_parse_raw_values() {
        assert!(FieldValue::Integer(4).matches("4"));
        assert!(!FieldValue::Integer(4).matches("four"));
        assert!(FieldValue::Boolean(true).matches("true"));
        assert!(FieldValue::Float(12.5).matches("12.5"));
    }

    #[test]
    fn test_null_never_matches() {
        assert!(FieldValue::Null.is_null());
        assert!(!FieldValue::Null.matches(""));
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(FieldValue::from_json(&json!(3)), Some(FieldValue::Integer(3)));
        assert_eq!(FieldValue::from_json(&json!(2.5)), Some(FieldValue::Float(2.5)));
        assert_eq!(
            FieldValue::from_json(&json!("km")),
            Some(FieldValue::String("km".to_string()))
        );
        assert_eq!(FieldValue::from_json(&json!(["a"])), None);
    }
}
