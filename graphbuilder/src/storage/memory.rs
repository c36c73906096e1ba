// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage driver for tests and dry runs

use super::traits::{EntryIter, StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

type TreeData = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Memory driver: one ordered map per tree
#[derive(Default)]
pub struct MemoryDriver {
    trees: RwLock<HashMap<String, TreeData>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Handle on one in-memory tree
pub struct MemoryTree {
    data: TreeData,
}

impl StorageTree for MemoryTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn iter(&self) -> StorageResult<EntryIter<'_>> {
        // Snapshot so the lock is not held while the caller iterates
        let items: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(items.into_iter()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<EntryIter<'_>> {
        let items: Vec<_> = self
            .data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(items.into_iter()))
    }

    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()> {
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn batch_remove(&self, keys: &[&[u8]]) -> StorageResult<()> {
        let mut data = self.data.write();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageDriver for MemoryDriver {
    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Box<dyn StorageTree>> {
        let data = self
            .trees
            .write()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(Box::new(MemoryTree { data }))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_scan_stops_at_prefix_boundary() {
        let driver = MemoryDriver::new();
        let tree = driver.open_tree("prefix_test").unwrap();

        tree.insert(b"user:1", b"alice").unwrap();
        tree.insert(b"user:2", b"bob").unwrap();
        tree.insert(b"users", b"x").unwrap();
        tree.insert(b"post:1", b"hello").unwrap();

        let items: Vec<_> = tree
            .scan_prefix(b"user:")
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn trees_with_the_same_name_share_data() {
        let driver = MemoryDriver::new();
        driver.open_tree("nodes").unwrap().insert(b"k", b"v").unwrap();

        let again = driver.open_tree("nodes").unwrap();
        assert_eq!(again.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(driver.open_tree("other").unwrap().get(b"k").unwrap().is_none());
    }

    #[test]
    fn batch_operations() {
        let driver = MemoryDriver::new();
        let tree = driver.open_tree("batch_test").unwrap();

        let entries = vec![
            (b"key1" as &[u8], b"value1" as &[u8]),
            (b"key2" as &[u8], b"value2" as &[u8]),
            (b"key3" as &[u8], b"value3" as &[u8]),
        ];
        tree.batch_insert(&entries).unwrap();
        tree.batch_remove(&[b"key1" as &[u8], b"key3" as &[u8]]).unwrap();

        assert!(!tree.contains_key(b"key1").unwrap());
        assert!(tree.contains_key(b"key2").unwrap());
        assert!(!tree.contains_key(b"key3").unwrap());
    }
}
