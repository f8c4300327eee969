//! Opaque upstream identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An identifier as the billing API handed it to us.
///
/// The upstream mixes numeric and string ids between endpoints, so the original
/// JSON type is preserved and echoed back unchanged in follow-up requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Read an id from a JSON value. Empty strings, nulls and non-integral
    /// numbers are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(EntityId::Number),
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| EntityId::Text(s.to_string()))
            }
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Number(n) => Value::from(*n),
            EntityId::Text(s) => Value::from(s.as_str()),
        }
    }

    /// Loose equality used when matching ids across endpoints that disagree
    /// on the JSON type (`42` vs `"42"`).
    pub fn matches(&self, other: &EntityId) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_numbers_and_strings() {
        assert_eq!(EntityId::from_value(&json!(42)), Some(EntityId::Number(42)));
        assert_eq!(EntityId::from_value(&json!(42.0)), Some(EntityId::Number(42)));
        assert_eq!(
            EntityId::from_value(&json!(" T-9 ")),
            Some(EntityId::Text("T-9".into()))
        );
        assert_eq!(EntityId::from_value(&json!("")), None);
        assert_eq!(EntityId::from_value(&json!(4.5)), None);
        assert_eq!(EntityId::from_value(&Value::Null), None);
    }

    #[test]
    fn preserves_json_type_on_the_way_back() {
        assert_eq!(EntityId::Number(7).to_value(), json!(7));
        assert_eq!(EntityId::from("7").to_value(), json!("7"));
        assert_eq!(serde_json::to_value(EntityId::Number(7)).unwrap(), json!(7));
    }

    #[test]
    fn matches_across_json_types() {
        assert!(EntityId::Number(42).matches(&EntityId::from("42")));
        assert!(!EntityId::Number(42).matches(&EntityId::from("43")));
    }
}
