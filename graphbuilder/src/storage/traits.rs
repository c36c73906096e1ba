// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Key-value driver abstraction the graph store is built on

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Boxed iterator over raw entries
pub type EntryIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// A named, ordered key-value tree
pub trait StorageTree: Send + Sync {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn iter(&self) -> StorageResult<EntryIter<'_>>;

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<EntryIter<'_>>;

    /// Insert all entries atomically
    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()>;

    /// Remove all keys atomically
    fn batch_remove(&self, keys: &[&[u8]]) -> StorageResult<()>;

    fn flush(&self) -> StorageResult<()>;
}

/// An open storage backend
pub trait StorageDriver: Send + Sync {
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    fn open_tree(&self, name: &str) -> StorageResult<Box<dyn StorageTree>>;

    fn flush(&self) -> StorageResult<()>;

    fn storage_type(&self) -> StorageType;
}
