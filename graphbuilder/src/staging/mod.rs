// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Staging area between the batch stager and the publisher
//!
//! Staged batches are opaque byte blobs addressed by a slash separated name
//! such as `nodes/Table.csv`. Any key-addressable storage can back it.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory holding node batches
pub const NODES_DIR: &str = "nodes";
/// Directory holding relationship batches
pub const RELATIONSHIPS_DIR: &str = "relationships";

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Staged batch not found: {0}")]
    NotFound(String),

    #[error("Invalid staging name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Named byte sink the stager writes and the publisher reads
pub trait StagingStore: Send + Sync {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StagingError>;

    fn read(&self, name: &str) -> Result<Vec<u8>, StagingError>;

    /// Names of all batches under `dir`, sorted
    fn list(&self, dir: &str) -> Result<Vec<String>, StagingError>;

    /// Drop every staged batch
    fn clear(&self) -> Result<(), StagingError>;
}

fn validate_name(name: &str) -> Result<(), StagingError> {
    let path = Path::new(name);
    let plain = !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(StagingError::InvalidName(name.to_string()))
    }
}

/// Staging in a local directory tree
pub struct FsStaging {
    root: PathBuf,
}

impl FsStaging {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StagingStore for FsStaging {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StagingError> {
        validate_name(name)?;
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StagingError> {
        validate_name(name)?;
        match std::fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StagingError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        validate_name(dir)?;
        let path = self.root.join(dir);
        if !path.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(format!("{}/{}", dir, entry.file_name().to_string_lossy()));
            }
        }
        names.sort();
        Ok(names)
    }

    fn clear(&self) -> Result<(), StagingError> {
        for dir in [NODES_DIR, RELATIONSHIPS_DIR] {
            let path = self.root.join(dir);
            if path.exists() {
                std::fs::remove_dir_all(path)?;
            }
        }
        Ok(())
    }
}

/// Staging held in memory
#[derive(Default)]
pub struct MemoryStaging {
    batches: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StagingStore for MemoryStaging {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StagingError> {
        validate_name(name)?;
        self.batches.write().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StagingError> {
        self.batches
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StagingError::NotFound(name.to_string()))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, StagingError> {
        let prefix = format!("{}/", dir);
        Ok(self
            .batches
            .read()
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<(), StagingError> {
        self.batches.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fs_staging_round_trip_and_listing() {
        let temp_dir = TempDir::new().unwrap();
        let staging = FsStaging::new(temp_dir.path());

        staging.write("nodes/Table.csv", b"KEY,LABEL\n").unwrap();
        staging.write("nodes/Column.csv", b"KEY,LABEL\n").unwrap();
        staging.write("relationships/Table_COLUMN_Column.csv", b"").unwrap();

        assert_eq!(
            staging.list(NODES_DIR).unwrap(),
            vec!["nodes/Column.csv", "nodes/Table.csv"]
        );
        assert_eq!(staging.read("nodes/Table.csv").unwrap(), b"KEY,LABEL\n");

        staging.clear().unwrap();
        assert!(staging.list(NODES_DIR).unwrap().is_empty());
        assert!(matches!(
            staging.read("nodes/Table.csv"),
            Err(StagingError::NotFound(_))
        ));
    }

    #[test]
    fn names_escaping_the_root_are_rejected() {
        let staging = MemoryStaging::new();
        assert!(matches!(
            staging.write("../outside.csv", b""),
            Err(StagingError::InvalidName(_))
        ));
        assert!(matches!(
            staging.write("/abs.csv", b""),
            Err(StagingError::InvalidName(_))
        ));
    }
}
