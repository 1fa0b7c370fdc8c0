//! Template and answer data: a closed value type instead of untyped JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered mapping of variable names to values.
pub type Variables = BTreeMap<String, Value>;

/// A single variable value.
///
/// Serialized untagged, so a `Variables` map reads and writes as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Seq(Vec<Value>),
    Map(Variables),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Parse a scalar from command-line text: `true`/`false`, integers and
    /// floats are typed, anything else stays a string.
    pub fn from_cli(raw: &str) -> Value {
        if let Ok(b) = raw.parse::<bool>() {
            return Value::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        Value::String(raw.to_string())
    }

    /// Split a `KEY=VALUE` assignment.
    pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(format!("expected KEY=VALUE, got '{raw}'"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty variable name in '{raw}'"));
        }
        Ok((key.to_string(), Value::from_cli(value)))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => b.fmt(f),
            Value::Integer(i) => i.fmt(f),
            Value::Float(x) => x.fmt(f),
            Value::String(s) => f.write_str(s),
            Value::Seq(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<Variables> for Value {
    fn from(map: Variables) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_are_typed() {
        assert_eq!(Value::from_cli("true"), Value::Bool(true));
        assert_eq!(Value::from_cli("42"), Value::Integer(42));
        assert_eq!(Value::from_cli("1.5"), Value::Float(1.5));
        assert_eq!(Value::from_cli("my-app"), Value::from("my-app"));
        assert_eq!(Value::from_cli("inf"), Value::from("inf"));
    }

    #[test]
    fn assignment_requires_equals_and_key() {
        let (k, v) = Value::parse_assignment("name=demo=1").unwrap();
        assert_eq!(k, "name");
        assert_eq!(v, Value::from("demo=1"));
        assert!(Value::parse_assignment("name").is_err());
        assert!(Value::parse_assignment("=x").is_err());
    }

    #[test]
    fn json_round_trip_keeps_variants() {
        let json = r#"{"a":1,"b":"x","c":[true,2.5],"d":{"e":"f"}}"#;
        let vars: Variables = serde_json::from_str(json).unwrap();
        assert_eq!(vars["a"], Value::Integer(1));
        assert_eq!(vars["c"], Value::Seq(vec![Value::Bool(true), Value::Float(2.5)]));
        assert_eq!(serde_json::to_string(&vars).unwrap(), json);
    }

    #[test]
    fn nested_values_display_as_json() {
        let v = Value::Seq(vec![Value::from("a"), Value::Integer(1)]);
        assert_eq!(v.to_string(), r#"["a",1]"#);
    }
}
