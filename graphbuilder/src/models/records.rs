// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph write units emitted by entities

use crate::value::Value;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Reserved column names in staged batches
pub const NODE_KEY: &str = "KEY";
pub const NODE_LABEL: &str = "LABEL";
pub const RELATION_START_LABEL: &str = "START_LABEL";
pub const RELATION_START_KEY: &str = "START_KEY";
pub const RELATION_END_LABEL: &str = "END_LABEL";
pub const RELATION_END_KEY: &str = "END_KEY";
pub const RELATION_TYPE: &str = "TYPE";
pub const RELATION_REVERSE_TYPE: &str = "REVERSE_TYPE";

/// A node to merge, identified by `(label, key)`
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub label: String,
    pub key: String,
    pub attributes: BTreeMap<String, Value>,
}

impl NodeRecord {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute; null values are dropped
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.attributes.insert(name.into(), value);
        }
        self
    }
}

/// A relationship between two keyed nodes.
///
/// Stored as two directed edges: `start -[rel_type]-> end` and
/// `end -[reverse_type]-> start`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRecord {
    pub start_label: String,
    pub start_key: String,
    pub end_label: String,
    pub end_key: String,
    pub rel_type: String,
    pub reverse_type: String,
    pub attributes: BTreeMap<String, Value>,
}

impl RelationRecord {
    pub fn new(
        start_label: impl Into<String>,
        start_key: impl Into<String>,
        end_label: impl Into<String>,
        end_key: impl Into<String>,
        rel_type: impl Into<String>,
        reverse_type: impl Into<String>,
    ) -> Self {
        Self {
            start_label: start_label.into(),
            start_key: start_key.into(),
            end_label: end_label.into(),
            end_key: end_key.into(),
            rel_type: rel_type.into(),
            reverse_type: reverse_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.attributes.insert(name.into(), value);
        }
        self
    }

    /// Identity used for duplicate suppression within a run
    pub fn dedup_key(&self) -> RelationKey {
        RelationKey {
            start_label: self.start_label.clone(),
            end_label: self.end_label.clone(),
            start_key: self.start_key.clone(),
            end_key: self.end_key.clone(),
            rel_type: self.rel_type.clone(),
        }
    }
}

/// `(start_label, end_label, start_key, end_key, type)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    pub start_label: String,
    pub end_label: String,
    pub start_key: String,
    pub end_key: String,
    pub rel_type: String,
}

/// Identifier of one pipeline execution.
///
/// Every node and relationship written by a run carries the run's tag;
/// entities carrying any other tag in a pruned scope are stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunTag(String);

impl RunTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Fresh tag of the form `20250101T120000Z-1a2b3c4d`
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%SZ"),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_attributes_are_not_recorded() {
        let node = NodeRecord::new("Table", "hive://gold.s1/t1")
            .with_attribute("name", "t1")
            .with_attribute("description", Value::Null);

        assert_eq!(node.attributes.len(), 1);
    }

    #[test]
    fn dedup_key_ignores_reverse_type_and_attributes() {
        let a = RelationRecord::new("Dashboard", "g://d", "Schema", "s1", "OWNER", "OWNER_OF");
        let b = RelationRecord::new("Dashboard", "g://d", "Schema", "s1", "OWNER", "OWNED")
            .with_attribute("since", 2020i64);

        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn generated_tags_are_distinct() {
        assert_ne!(RunTag::generate(), RunTag::generate());
    }
}
