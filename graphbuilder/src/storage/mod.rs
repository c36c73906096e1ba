// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph storage
//!
//! This module provides:
//! - Pluggable key-value drivers (sled, redb, memory)
//! - The property graph store the publisher merges into and prunes

pub mod graph_store;
pub mod memory;
#[cfg(feature = "redb-backend")]
pub mod redb;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;
pub mod types;

pub use graph_store::{
    GraphStore, KvGraphStore, PruneScope, ScopeCounts, StoredNode, StoredRelation,
};
pub use traits::{StorageDriver, StorageTree};
pub use types::{StorageError, StorageResult, StorageType};
