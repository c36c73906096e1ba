// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph-serializable metadata entities
//!
//! An entity describes itself as two independent lazy sequences: its nodes
//! and its relationships. Consumers read them through a [`GraphEmitter`],
//! which applies the run's [`DedupSet`] so that a relationship shared by
//! several entities is emitted once per run.

pub mod dashboard;
pub mod emitter;
pub mod records;
pub mod scope;
pub mod table;
pub mod tag;

use crate::value::RawRecord;
use thiserror::Error;

pub use dashboard::DashboardMetadata;
pub use emitter::{DedupSet, GraphEmitter};
pub use records::{NodeRecord, RelationKey, RelationRecord, RunTag};
pub use scope::{OwnedScopes, RelationScope};
pub use table::{ColumnMetadata, TableMetadata};

/// Lazy node sequence of one entity
pub type NodeIter<'a> = Box<dyn Iterator<Item = NodeRecord> + 'a>;
/// Lazy relationship sequence of one entity
pub type RelationIter<'a> = Box<dyn Iterator<Item = RelationRecord> + 'a>;

/// Entity-construction errors. They affect one entity, never the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{entity} is missing required attribute '{attribute}'")]
    MissingAttribute {
        entity: &'static str,
        attribute: String,
    },
}

impl ModelError {
    pub fn missing(entity: &'static str, attribute: impl Into<String>) -> Self {
        ModelError::MissingAttribute {
            entity,
            attribute: attribute.into(),
        }
    }
}

/// Something that can be written to the graph as nodes and relationships
pub trait GraphSerializable {
    /// Nodes of this entity. Order only matters for reproducibility.
    fn nodes(&self) -> NodeIter<'_>;

    /// Relationships of this entity, the defining relationship first.
    ///
    /// Relationships to optional sub-entities appear only when the
    /// corresponding node is emitted by [`GraphSerializable::nodes`].
    fn relations(&self) -> RelationIter<'_>;

    /// Labels and relationship triples a run of this kind may prune.
    /// Nothing by default.
    fn owned_scopes() -> OwnedScopes
    where
        Self: Sized,
    {
        OwnedScopes::default()
    }
}

/// Construction of an entity from one source record
pub trait FromRecord: Sized {
    fn from_record(record: &RawRecord) -> Result<Self, ModelError>;
}

/// Non-empty, trimmed string
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
