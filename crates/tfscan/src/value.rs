//! value representation
//!
//! The normalized model contains the following data types
//! - null
//! - boolean (true/false)
//! - number (always f64, large integers lose precision)
//! - string (utf-8)
//! - list (ordered sequence of values, sets are not deduplicated)
//! - map (string keys, source order is kept for output but ignored by equality)
//!
//! Unresolved references are plain strings, see [crate::resolve].
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

pub type Map = indexmap::IndexMap<String, Value>;

/// Largest integer that f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Map lookup, `None` for missing keys and non-map values
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<hcl::Number> for Value {
    fn from(value: hcl::Number) -> Self {
        // hcl numbers are i64, u64 or finite f64, so this only falls back on a broken invariant
        value.as_f64().map_or(Value::Null, Value::Number)
    }
}

impl<K: ToString, V: Into<Value>> From<hcl::value::Map<K, V>> for Value {
    fn from(value: hcl::value::Map<K, V>) -> Self {
        Value::Map(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<hcl::Value> for Value {
    fn from(value: hcl::Value) -> Value {
        match value {
            hcl::Value::Null => Value::Null,
            hcl::Value::Bool(b) => b.into(),
            hcl::Value::Number(n) => n.into(),
            hcl::Value::String(s) => s.into(),
            hcl::Value::Array(a) => a.into(),
            hcl::Value::Object(o) => o.into(),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Number(value) => {
                if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
                    serializer.serialize_i64(*value as i64)
                } else {
                    serializer.serialize_f64(*value)
                }
            }
            Value::String(value) => serializer.serialize_str(value),
            Value::List(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Map(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hcl::eval::Evaluate;
    use pretty_assertions::assert_eq;

    fn literal(source: &str) -> Value {
        let expr: hcl_edit::expr::Expression = source.parse().expect("expression must parse");
        let expr: hcl::Expression = expr.into();
        expr.evaluate(&hcl::eval::Context::new())
            .expect("literal must evaluate")
            .into()
    }

    #[test]
    fn coerces_hcl_values() {
        let value = literal(
            r#"{
                name = "logs"
                port = 443
                ratio = 0.5
                enabled = true
                missing = null
                tags = ["a", "b", "a"]
            }"#,
        );

        let mut expected = Map::new();
        expected.insert("name".into(), "logs".into());
        expected.insert("port".into(), Value::Number(443.0));
        expected.insert("ratio".into(), Value::Number(0.5));
        expected.insert("enabled".into(), true.into());
        expected.insert("missing".into(), Value::Null);
        expected.insert("tags".into(), vec!["a", "b", "a"].into());

        assert_eq!(value, Value::Map(expected));
    }

    #[test]
    fn map_equality_ignores_order() {
        let mut one = Map::new();
        one.insert("a".into(), true.into());
        one.insert("b".into(), false.into());

        let mut two = Map::new();
        two.insert("b".into(), false.into());
        two.insert("a".into(), true.into());

        assert_eq!(Value::Map(one), Value::Map(two));
    }

    #[test]
    fn large_integers_lose_precision() {
        assert_eq!(
            literal("9007199254740993"),
            Value::Number(9_007_199_254_740_992.0)
        );
    }

    #[test]
    fn serializes_integral_numbers_without_fraction() {
        let value: Value = vec![
            Value::Number(443.0),
            Value::Number(0.25),
            Value::Null,
            Value::Bool(false),
        ]
        .into();

        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[443,0.25,null,false]"#
        );
    }
}
