// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row sources and extractors
//!
//! A [`QueryConnection`] hands out ordered raw records for a query. An
//! [`Extractor`] turns those records into entities, one per `extract` call.

pub mod generic;
pub mod graph_dashboard;
pub mod grouping;
pub mod sql_table;

use crate::config::{Config, ConfigError};
use crate::models::ModelError;
use crate::storage::StorageError;
use crate::value::RawRecord;
use std::path::Path;
use thiserror::Error;

pub use generic::GenericExtractor;
pub use graph_dashboard::GraphDashboardExtractor;
pub use grouping::{group_contiguous, group_key, GroupBy, GroupKey, RecordGroup};
pub use sql_table::{ColumnMapping, SqlDialect, SqlTableMetadataExtractor};

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The row source itself failed; the run cannot continue
    #[error("Row source error: {0}")]
    Source(String),

    /// One entity could not be built; later entities are unaffected
    #[error("Skipping entity: {0}")]
    Entity(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph store error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extractor used before init")]
    NotInitialized,
}

impl ExtractError {
    /// Whether the error only concerns the entity being built
    pub fn is_entity_scoped(&self) -> bool {
        matches!(self, ExtractError::Entity(_))
    }
}

/// Boxed stream of raw records
pub type RecordIter = Box<dyn Iterator<Item = Result<RawRecord, ExtractError>> + Send>;

/// Source of ordered raw records
pub trait QueryConnection: Send {
    fn issue(&mut self, query: &str) -> Result<RecordIter, ExtractError>;
}

/// Connection serving a fixed set of rows for any query
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnection {
    rows: Vec<RawRecord>,
}

impl InMemoryConnection {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    /// Rows from a JSON array of objects
    pub fn from_json_str(text: &str) -> Result<Self, ExtractError> {
        let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(text).map_err(|e| ExtractError::Source(e.to_string()))?;
        Ok(Self::new(parsed.into_iter().map(RawRecord::from).collect()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::Source(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl QueryConnection for InMemoryConnection {
    fn issue(&mut self, _query: &str) -> Result<RecordIter, ExtractError> {
        Ok(Box::new(self.rows.clone().into_iter().map(Ok)))
    }
}

/// Pull-style producer of entities
pub trait Extractor: Send {
    type Item;

    /// Read configuration and prepare the source. Configuration errors
    /// surface here, before anything is extracted.
    fn init(&mut self, config: &Config) -> Result<(), ExtractError>;

    /// Next entity, `Ok(None)` once the source is exhausted.
    ///
    /// An [`ExtractError::Entity`] error skips one entity; calling
    /// `extract` again continues with the next one.
    fn extract(&mut self) -> Result<Option<Self::Item>, ExtractError>;

    /// Configuration scope, e.g. `extractor.sql_table`
    fn scope(&self) -> &'static str;

    /// Source records dropped before they reached an entity
    fn skipped_records(&self) -> usize {
        0
    }

    fn close(&mut self) -> Result<(), ExtractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn json_rows_become_raw_records() {
        let mut connection = InMemoryConnection::from_json_str(
            r#"[{"schema": "s1", "name": "t1", "sort_order": 1, "description": null}]"#,
        )
        .unwrap();

        let rows: Vec<_> = connection
            .issue("SELECT 1")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("sort_order"), Some(&Value::Integer(1)));
        assert!(rows[0].get("description").is_none());
    }

    #[test]
    fn non_array_input_is_a_source_error() {
        let err = InMemoryConnection::from_json_str(r#"{"schema": "s1"}"#).unwrap_err();
        assert!(matches!(err, ExtractError::Source(_)));
        assert!(!err.is_entity_scoped());
    }
}
