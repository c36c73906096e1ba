// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled storage driver implementation

use super::traits::{EntryIter, StorageDriver, StorageTree};
use super::types::{StorageError, StorageResult, StorageType};
use std::path::Path;

/// Sled driver implementation
pub struct SledDriver {
    db: sled::Db,
}

/// Sled tree wrapper that implements StorageTree trait
pub struct SledTree {
    tree: sled::Tree,
}

fn map_sled_error(e: sled::Error) -> StorageError {
    match e {
        sled::Error::Io(io) => StorageError::IoError(io),
        other @ sled::Error::Corruption { .. } => {
            StorageError::DeserializationError(other.to_string())
        }
        other => StorageError::BackendSpecific(other.to_string()),
    }
}

impl StorageTree for SledTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree.insert(key, value).map_err(map_sled_error)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .tree
            .get(key)
            .map_err(map_sled_error)?
            .map(|ivec| ivec.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.tree.remove(key).map_err(map_sled_error)?;
        Ok(())
    }

    fn iter(&self) -> StorageResult<EntryIter<'_>> {
        Ok(Box::new(self.tree.iter().map(|result| {
            result
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(map_sled_error)
        })))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<EntryIter<'_>> {
        Ok(Box::new(self.tree.scan_prefix(prefix).map(|result| {
            result
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(map_sled_error)
        })))
    }

    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(*key, *value);
        }
        self.tree.apply_batch(batch).map_err(map_sled_error)
    }

    fn batch_remove(&self, keys: &[&[u8]]) -> StorageResult<()> {
        let mut batch = sled::Batch::default();
        for key in keys {
            batch.remove(*key);
        }
        self.tree.apply_batch(batch).map_err(map_sled_error)
    }

    fn flush(&self) -> StorageResult<()> {
        self.tree.flush().map_err(map_sled_error)?;
        Ok(())
    }
}

impl StorageDriver for SledDriver {
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path).map_err(map_sled_error)?;
        Ok(SledDriver { db })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Box<dyn StorageTree>> {
        let tree = self.db.open_tree(name).map_err(map_sled_error)?;
        Ok(Box::new(SledTree { tree }))
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(map_sled_error)?;
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }
}
