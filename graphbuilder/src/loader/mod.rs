// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Loading emitted records into staged batches

pub mod csv_batch;
pub mod csv_stager;

use crate::config::{Config, ConfigError};
use crate::models::GraphEmitter;
use crate::staging::StagingError;
use thiserror::Error;

pub use csv_batch::{decode_nodes, decode_relations, node_batch_name, relation_batch_name, BatchBuilder};
pub use csv_stager::CsvBatchStager;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed batch {batch}: {reason}")]
    Malformed { batch: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// What a loader wrote when it was closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub node_batches: usize,
    pub relation_batches: usize,
    pub nodes: usize,
    pub relations: usize,
}

/// Consumer of emitted nodes and relationships
pub trait Loader: Send {
    fn init(&mut self, config: &Config) -> Result<(), StageError>;

    /// Drain one entity's records
    fn load(&mut self, emitter: &mut GraphEmitter<'_>) -> Result<(), StageError>;

    /// Write out everything buffered
    fn close(&mut self) -> Result<StageSummary, StageError>;

    fn scope(&self) -> &'static str;
}
