// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! REDB storage driver implementation

use super::traits::{EntryIter, StorageDriver, StorageTree};
use super::types::{StorageError, StorageResult, StorageType};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

/// REDB driver implementation
pub struct RedbDriver {
    db: Arc<Database>,
}

/// REDB tree wrapper that implements StorageTree trait
/// In REDB, each "tree" is actually a separate table in the database
pub struct RedbTree {
    db: Arc<Database>,
    table_name: String,
}

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::BackendSpecific(e.to_string())
}

impl RedbTree {
    fn definition(&self) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
        TableDefinition::new(&self.table_name)
    }

    /// Collect matching entries inside one read transaction.
    ///
    /// REDB's iterators are tied to transactions, so results are buffered.
    fn collect_entries(&self, prefix: &[u8]) -> StorageResult<EntryIter<'_>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(self.definition()).map_err(backend)?;

        let items: Vec<StorageResult<(Vec<u8>, Vec<u8>)>> = table
            .iter()
            .map_err(backend)?
            .map(|result| {
                result
                    .map(|(k, v)| (k.value().to_vec(), v.value().to_vec()))
                    .map_err(backend)
            })
            .filter(|result| match result {
                Ok((key, _)) => key.starts_with(prefix),
                Err(_) => true, // Keep errors
            })
            .collect();

        Ok(Box::new(items.into_iter()))
    }
}

impl StorageTree for RedbTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.batch_insert(&[(key, value)])
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(self.definition()).map_err(backend)?;
        let result = table.get(key).map_err(backend)?;
        Ok(result.map(|guard| guard.value().to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.batch_remove(&[key])
    }

    fn iter(&self) -> StorageResult<EntryIter<'_>> {
        self.collect_entries(&[])
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<EntryIter<'_>> {
        self.collect_entries(prefix)
    }

    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(self.definition()).map_err(backend)?;
            for (key, value) in entries {
                table.insert(*key, *value).map_err(backend)?;
            }
        }
        write_txn.commit().map_err(backend)?;
        Ok(())
    }

    fn batch_remove(&self, keys: &[&[u8]]) -> StorageResult<()> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(self.definition()).map_err(backend)?;
            for key in keys {
                table.remove(*key).map_err(backend)?;
            }
        }
        write_txn.commit().map_err(backend)?;
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        // Every committed write transaction is already durable
        Ok(())
    }
}

impl StorageDriver for RedbDriver {
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        // REDB requires a file path, not a directory
        let db_path = if path.as_ref().is_dir() {
            path.as_ref().join("graphbuilder.redb")
        } else {
            path.as_ref().to_path_buf()
        };

        let db = Database::create(&db_path).map_err(|e| match e {
            other @ redb::DatabaseError::DatabaseAlreadyOpen => {
                StorageError::Unavailable(other.to_string())
            }
            other => backend(other),
        })?;

        Ok(RedbDriver { db: Arc::new(db) })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Box<dyn StorageTree>> {
        // Make sure the table exists so later read transactions can open it
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let table_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(name);
            write_txn.open_table(table_def).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        Ok(Box::new(RedbTree {
            db: self.db.clone(),
            table_name: name.to_string(),
        }))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Redb
    }
}
