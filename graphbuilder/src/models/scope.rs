// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph scopes an entity kind is authoritative for
//!
//! A run may only prune what its entity kind declares. Labels come in two
//! flavours: exclusive labels belong to one kind, so every stale node of
//! the label is removed; shared labels (schemas, descriptions, tags, ...)
//! are written by several kinds, so only stale nodes left without any
//! relationship are removed. Relationships are owned per
//! `(start label, type, end label)` triple.

use std::fmt;
use std::str::FromStr;

/// A relationship triple, `Start:TYPE:End`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationScope {
    pub start_label: String,
    pub rel_type: String,
    pub end_label: String,
}

impl RelationScope {
    pub fn new(
        start_label: impl Into<String>,
        rel_type: impl Into<String>,
        end_label: impl Into<String>,
    ) -> Self {
        Self {
            start_label: start_label.into(),
            rel_type: rel_type.into(),
            end_label: end_label.into(),
        }
    }

    pub fn matches(&self, start_label: &str, rel_type: &str, end_label: &str) -> bool {
        self.start_label == start_label && self.rel_type == rel_type && self.end_label == end_label
    }
}

impl fmt::Display for RelationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start_label, self.rel_type, self.end_label)
    }
}

impl FromStr for RelationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [start, rel_type, end] if ![start, rel_type, end].iter().any(|p| p.is_empty()) => {
                Ok(Self::new(*start, *rel_type, *end))
            }
            _ => Err(format!("'{}' is not of the form Start:TYPE:End", s)),
        }
    }
}

/// Everything one entity kind may prune
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedScopes {
    /// Labels only this kind writes
    pub labels: Vec<String>,
    /// Labels other kinds write too; only detached stale nodes are pruned
    pub shared_labels: Vec<String>,
    pub relations: Vec<RelationScope>,
}

impl OwnedScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    pub fn shared_label(mut self, label: &str) -> Self {
        self.shared_labels.push(label.to_string());
        self
    }

    pub fn relation(mut self, start_label: &str, rel_type: &str, end_label: &str) -> Self {
        self.relations
            .push(RelationScope::new(start_label, rel_type, end_label));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.shared_labels.is_empty() && self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_scopes_parse_from_triples() {
        let scope: RelationScope = "Table : DESCRIPTION : Description".parse().unwrap();
        assert_eq!(scope, RelationScope::new("Table", "DESCRIPTION", "Description"));
        assert_eq!(scope.to_string(), "Table:DESCRIPTION:Description");

        assert!("Table:DESCRIPTION".parse::<RelationScope>().is_err());
        assert!("Table::Description".parse::<RelationScope>().is_err());
    }
}
