// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Scalar values and raw source records
//!
//! A [`RawRecord`] is one row handed over by a row source. Field values are
//! [`Value`]s; an absent field and an explicit `Null` are both treated as
//! missing by every consumer in this crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property value carried by records, nodes and relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

/// Coarse type of a value, used to type staged batch columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    List,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::List => "list",
        }
    }
}

impl std::str::FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ValueKind::String),
            "integer" => Ok(ValueKind::Integer),
            "float" => Ok(ValueKind::Float),
            "boolean" => Ok(ValueKind::Boolean),
            "list" => Ok(ValueKind::List),
            _ => Err(format!(
                "Unknown value kind: {}. Valid options: string, integer, float, boolean, list",
                s
            )),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of a non-null value
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Float(_) => Some(ValueKind::Float),
            Value::String(_) => Some(ValueKind::String),
            Value::List(_) => Some(ValueKind::List),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Parse the textual form of a staged cell back into a value of `kind`.
    ///
    /// Empty cells are `Null`. Cells that do not parse as `kind` are kept as
    /// strings rather than rejected.
    pub fn parse_as(text: &str, kind: ValueKind) -> Value {
        if text.is_empty() {
            return Value::Null;
        }
        match kind {
            ValueKind::String => Value::String(text.to_string()),
            ValueKind::Integer => text
                .parse()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::String(text.to_string())),
            ValueKind::Float => text
                .parse()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::String(text.to_string())),
            ValueKind::Boolean => match text {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => Value::String(text.to_string()),
            },
            ValueKind::List => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(text.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(_) => write!(f, "{}", serde_json::Value::from(self)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::String).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            // Nested objects are not scalar; keep their JSON text.
            other @ serde_json::Value::Object(_) => Value::String(other.to_string()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

/// One row produced by a row source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: BTreeMap<String, Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Field value, `None` when the field is absent or null
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Non-empty string rendering of a field
    pub fn get_string(&self, field: &str) -> Option<String> {
        self.get(field)
            .map(|v| v.to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// String items of a list field; a scalar string counts as one item
    pub fn get_string_list(&self, field: &str) -> Vec<String> {
        match self.get(field) {
            Some(Value::List(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(other) => {
                let text = other.to_string();
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text]
                }
            }
            None => Vec::new(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RawRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl FromIterator<(String, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_absent_fields_are_missing() {
        let record = RawRecord::new()
            .with("schema", "s1")
            .with("description", Value::Null);

        assert_eq!(record.get_string("schema"), Some("s1".to_string()));
        assert!(record.get("description").is_none());
        assert!(record.get("table").is_none());
    }

    #[test]
    fn staged_cells_parse_back_to_their_kind() {
        assert_eq!(Value::parse_as("3", ValueKind::Integer), Value::Integer(3));
        assert_eq!(Value::parse_as("", ValueKind::Integer), Value::Null);
        assert_eq!(
            Value::parse_as("abc", ValueKind::Integer),
            Value::String("abc".to_string())
        );
        assert_eq!(
            Value::parse_as("[\"a\",\"b\"]", ValueKind::List),
            Value::from(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn scalar_string_is_a_single_item_list() {
        let record = RawRecord::new()
            .with("tags", "pii")
            .with("cols", vec!["a".to_string(), "b".to_string()]);

        assert_eq!(record.get_string_list("tags"), vec!["pii"]);
        assert_eq!(record.get_string_list("cols"), vec!["a", "b"]);
        assert!(record.get_string_list("missing").is_empty());
    }
}
