// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver types and error handling
//!
//! This module defines the types, enums, and error handling used throughout
//! the storage driver system.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Storage driver type configuration
///
/// Specifies which underlying storage technology backs the graph store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StorageType {
    /// Sled - Pure Rust embedded database
    #[default]
    Sled,

    /// Redb - Pure Rust ACID-compliant embedded database
    Redb,

    /// Memory - In-memory storage for testing
    Memory,
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageType::Sled),
            "redb" => Ok(StorageType::Redb),
            "memory" => Ok(StorageType::Memory),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: sled, redb, memory",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Sled => "sled",
            StorageType::Redb => "redb",
            StorageType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Error type for storage operations
///
/// Errors are classified as transient (worth retrying: lost connection,
/// lock conflict, interrupted I/O) or permanent (corrupt entry, constraint
/// violation, unsupported backend).
#[derive(Debug)]
pub enum StorageError {
    /// I/O related errors (file system, network, etc.)
    IoError(std::io::Error),

    /// Data serialization failed
    SerializationError(String),

    /// Stored bytes could not be decoded
    DeserializationError(String),

    /// Backend temporarily unavailable (connection loss, lock conflict)
    Unavailable(String),

    /// Write rejected by the store (malformed record, constraint violation)
    Rejected(String),

    /// Driver-specific error (Sled, Redb, Memory)
    BackendSpecific(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Unavailable(_) => true,
            StorageError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(e) => write!(f, "I/O error: {}", e),
            StorageError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            StorageError::DeserializationError(e) => write!(f, "Deserialization error: {}", e),
            StorageError::Unavailable(e) => write!(f, "Storage unavailable: {}", e),
            StorageError::Rejected(e) => write!(f, "Write rejected: {}", e),
            StorageError::BackendSpecific(e) => write!(f, "Storage driver error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::IoError(e)
    }
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_type_parses_case_insensitively() {
        assert_eq!("REDB".parse::<StorageType>().unwrap(), StorageType::Redb);
        assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::Memory);
        assert!("rocks".parse::<StorageType>().is_err());
    }

    #[test]
    fn only_connection_style_failures_are_transient() {
        assert!(StorageError::Unavailable("lock held".into()).is_transient());
        assert!(StorageError::IoError(std::io::ErrorKind::TimedOut.into()).is_transient());
        assert!(!StorageError::Rejected("bad key".into()).is_transient());
        assert!(!StorageError::IoError(std::io::ErrorKind::NotFound.into()).is_transient());
    }
}
