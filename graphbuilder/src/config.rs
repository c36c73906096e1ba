// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Component configuration
//!
//! Configuration is a flat mapping of dotted option names to string values.
//! Every component owns a scope (for example `extractor.sql_table`) and sees
//! only its own options through [`Config::scoped`]. Defaults are layered in
//! with [`Config::with_fallback`]; a required option that is still missing
//! after that is reported when the component is initialized.

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Configuration errors. All of them are fatal at initialization time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required option '{key}'")]
    Missing { key: String },

    #[error("Invalid value '{value}' for option '{key}': expected {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat option -> value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a JSON document. Nested objects become dotted keys and arrays
    /// become comma separated lists.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let serde_json::Value::Object(map) = json else {
            return Err(ConfigError::Parse(
                "top-level configuration must be a JSON object".to_string(),
            ));
        };

        let mut config = Config::new();
        for (key, value) in map {
            flatten_into(&mut config.entries, key, value);
        }
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Options under `scope`, with the scope prefix stripped
    pub fn scoped(&self, scope: &str) -> Config {
        let prefix = format!("{}.", scope);
        Config {
            entries: self
                .entries
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(&prefix)
                        .map(|rest| (rest.to_string(), v.clone()))
                })
                .collect(),
        }
    }

    /// Options of `self`, completed by those of `fallback` that `self` lacks
    pub fn with_fallback(&self, fallback: &Config) -> Config {
        let mut entries = fallback.entries.clone();
        entries.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Config { entries }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or(default).to_string()
    }

    pub fn get_required(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get_string(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::Missing {
                key: key.to_string(),
            }),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get_string(key) {
            None => Ok(default),
            Some(value) => match value.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(invalid(key, value, "a boolean")),
            },
        }
    }

    pub fn get_u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get_string(key) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| invalid(key, value, "a non-negative integer")),
        }
    }

    pub fn get_usize_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        self.get_u64_or(key, default as u64).map(|v| v as usize)
    }

    /// Comma separated list; `None` when the option is absent
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get_string(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn flatten_into(entries: &mut BTreeMap<String, String>, key: String, value: serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (child, child_value) in map {
                flatten_into(entries, format!("{}.{}", key, child), child_value);
            }
        }
        serde_json::Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",");
            entries.insert(key, joined);
        }
        serde_json::Value::String(s) => {
            entries.insert(key, s);
        }
        serde_json::Value::Null => {}
        other => {
            entries.insert(key, other.to_string());
        }
    }
}
