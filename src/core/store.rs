//! Generic filtering and sorting over stored entities

use crate::core::entity::Data;
use crate::core::field::FieldValue;
use crate::core::service::DataService;
use chrono::NaiveDate;
use serde_json::Value;
use std::cmp::Ordering;

/// Filtering and sorting driven by [`Data::field_value`]
///
/// Every [`DataService`] gets this for free, so list endpoints can accept
/// `filter` and `sort` query parameters for any resource.
pub trait QueryableStore<T: Data>: Send + Sync {
    /// Keep the entities matching every entry of a JSON filter object
    ///
    /// Keys are field names, optionally suffixed with `>`, `<`, `>=` or `<=`.
    /// Unknown fields match nothing; a non-object filter is ignored.
    fn apply_filters(&self, data: Vec<T>, filter: &Value) -> Vec<T> {
        let Some(obj) = filter.as_object() else {
            return data;
        };

        data.into_iter()
            .filter(|entity| {
                obj.iter().all(|(key, expected)| {
                    let (field, op) = split_operator(key);
                    entity
                        .field_value(field)
                        .and_then(|actual| compare(&actual, expected))
                        .is_some_and(|ordering| op.accepts(ordering))
                })
            })
            .collect()
    }

    /// Sort by `field`, `field:asc` or `field:desc`. Missing values sort last.
    fn apply_sort(&self, mut data: Vec<T>, sort: &str) -> Vec<T> {
        let (field, descending) = match sort.split_once(':') {
            Some((field, dir)) => (field, dir.eq_ignore_ascii_case("desc")),
            None => (sort, false),
        };

        data.sort_by(|a, b| {
            let ordering = match (a.field_value(field), b.field_value(field)) {
                (Some(x), Some(y)) => order(&x, &y),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        data
    }
}

impl<T: Data, S: DataService<T> + ?Sized> QueryableStore<T> for S {}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Operator {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
        }
    }
}

fn split_operator(key: &str) -> (&str, Operator) {
    if let Some(field) = key.strip_suffix(">=") {
        (field, Operator::Gte)
    } else if let Some(field) = key.strip_suffix("<=") {
        (field, Operator::Lte)
    } else if let Some(field) = key.strip_suffix('>') {
        (field, Operator::Gt)
    } else if let Some(field) = key.strip_suffix('<') {
        (field, Operator::Lt)
    } else {
        (key, Operator::Eq)
    }
}

/// Compare a stored value with a filter operand: `Some(actual.cmp(expected))`
fn compare(actual: &FieldValue, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (FieldValue::Integer(a), Value::Number(n)) => match n.as_i64() {
            Some(b) => Some(a.cmp(&b)),
            None => (*a as f64).partial_cmp(&n.as_f64()?),
        },
        (FieldValue::Float(a), Value::Number(n)) => a.partial_cmp(&n.as_f64()?),
        (FieldValue::Boolean(a), Value::Bool(b)) => Some(a.cmp(b)),
        (FieldValue::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (FieldValue::Uuid(a), Value::String(b)) => Some(a.to_string().cmp(b)),
        (FieldValue::Date(a), Value::String(b)) => Some(a.cmp(&b.parse::<NaiveDate>().ok()?)),
        (FieldValue::DateTime(a), Value::String(b)) => {
            Some(a.cmp(&b.parse::<chrono::DateTime<chrono::Utc>>().ok()?))
        }
        (FieldValue::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn order(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Integer(x), FieldValue::Integer(y)) => x.cmp(y),
        (FieldValue::Float(x), FieldValue::Float(y)) => x.total_cmp(y),
        (FieldValue::Integer(x), FieldValue::Float(y)) => (*x as f64).total_cmp(y),
        (FieldValue::Float(x), FieldValue::Integer(y)) => x.total_cmp(&(*y as f64)),
        (FieldValue::String(x), FieldValue::String(y)) => x.cmp(y),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(y),
        (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(y),
        (FieldValue::DateTime(x), FieldValue::DateTime(y)) => x.cmp(y),
        (FieldValue::Uuid(x), FieldValue::Uuid(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_operator() {
        assert_eq!(split_operator("price>="), ("price", Operator::Gte));
        assert_eq!(split_operator("price<"), ("price", Operator::Lt));
        assert_eq!(split_operator("city"), ("city", Operator::Eq));
    }

    #[test]
    fn test_compare_numbers_across_representations() {
        assert_eq!(
            compare(&FieldValue::Integer(5), &serde_json::json!(4.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare(&FieldValue::Float(12.0), &serde_json::json!(12)),
            Some(Ordering::Equal)
        );
        assert_eq!(compare(&FieldValue::Float(1.0), &serde_json::json!("1")), None);
    }

    #[test]
    fn test_compare_dates_from_strings() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            compare(&FieldValue::Date(d), &serde_json::json!("2025-02-28")),
            Some(Ordering::Greater)
        );
    }
}
