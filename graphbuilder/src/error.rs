// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the graphbuilder crate

use crate::config::ConfigError;
use crate::extractor::ExtractError;
use crate::loader::StageError;
use crate::models::ModelError;
use crate::publisher::PublishError;
use crate::staging::StagingError;
use crate::storage::StorageError;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Row source or entity construction errors
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// An entity lacks a required attribute
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Writing or reading staged batches
    #[error("Staging error: {0}")]
    Stage(#[from] StageError),

    #[error("Staging area error: {0}")]
    Staging(#[from] StagingError),

    /// Graph store errors outside of publishing
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Upsert or prune failures
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl Error {
    /// Whether the error only concerns one entity and the run may go on
    pub fn is_entity_scoped(&self) -> bool {
        match self {
            Error::Extract(e) => e.is_entity_scoped(),
            Error::Model(_) => true,
            _ => false,
        }
    }
}
