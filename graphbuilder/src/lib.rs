// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! # graphbuilder
//!
//! Metadata ingestion into a property graph. Rows describing tables,
//! columns and dashboards are grouped into entities, serialized into keyed
//! nodes and relationships, staged as per-label CSV batches, then merged
//! into a graph store and pruned of anything the run did not refresh.
//!
//! ```text
//! QueryConnection -> Extractor -> GraphEmitter -> CsvBatchStager
//!                                     |                 |
//!                                 DedupSet        StagingStore
//!                                                       |
//!                          GraphStore <- GraphPublisher -+
//! ```
//!
//! ## Modules
//!
//! - [`extractor`] - row sources, contiguous grouping and entity extractors
//! - [`models`] - graph-serializable entities and run-scoped dedup
//! - [`loader`] - CSV batch stager
//! - [`staging`] - byte sinks between stager and publisher
//! - [`publisher`] - idempotent upsert and staleness pruning
//! - [`storage`] - graph store over sled, redb or memory
//! - [`job`] - wiring of one extract/stage/publish run

pub mod config;
pub mod error;
pub mod extractor;
pub mod job;
pub mod loader;
pub mod models;
pub mod publisher;
pub mod staging;
pub mod storage;
pub mod value;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use extractor::{
    ExtractError, Extractor, GenericExtractor, GraphDashboardExtractor, InMemoryConnection,
    QueryConnection, SqlDialect, SqlTableMetadataExtractor,
};
pub use job::{DefaultJob, DefaultTask, JobSummary, RunContext, TaskSummary};
pub use loader::{CsvBatchStager, Loader, StageError, StageSummary};
pub use models::{
    ColumnMetadata, DashboardMetadata, DedupSet, FromRecord, GraphEmitter, GraphSerializable,
    ModelError, NodeRecord, OwnedScopes, RelationRecord, RelationScope, RunTag, TableMetadata,
};
pub use publisher::{
    CancellationToken, GraphPublisher, PublishError, PublishSummary, PublisherConfig,
};
pub use staging::{FsStaging, MemoryStaging, StagingError, StagingStore};
pub use storage::{GraphStore, KvGraphStore, PruneScope, StorageError, StorageType};
pub use value::{RawRecord, Value, ValueKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
