// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property graph store
//!
//! Nodes are merged by `(label, key)`; relationships are merged by their
//! endpoints and type and are kept as a pair of opposite directed edges.
//! Every write stamps the entity with the run's `published_tag`, which is
//! what staleness pruning compares against.
//!
//! A node merge is authoritative for the attributes its record carries: a
//! `Null` attribute removes the stored value, attributes the record does
//! not mention are kept.

use super::memory::MemoryDriver;
#[cfg(feature = "redb-backend")]
use super::redb::RedbDriver;
#[cfg(feature = "sled-backend")]
use super::sled::SledDriver;
use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageError, StorageResult, StorageType};
use crate::models::{NodeRecord, RelationRecord, RelationScope, RunTag};
use crate::value::Value;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

const NODES_TREE: &str = "graph_nodes";
const RELATIONS_TREE: &str = "graph_relations";
const SEPARATOR: u8 = 0x1f;

/// A node as persisted in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub label: String,
    pub key: String,
    pub attributes: BTreeMap<String, Value>,
    pub published_tag: String,
}

/// One directed edge as persisted in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRelation {
    pub start_label: String,
    pub start_key: String,
    pub end_label: String,
    pub end_key: String,
    pub rel_type: String,
    /// Type of the paired edge running the other way
    pub reverse_type: String,
    pub attributes: BTreeMap<String, Value>,
    pub published_tag: String,
}

/// Unit of staleness pruning
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PruneScope {
    /// Edges of one `(start label, type, end label)` triple
    Relation(RelationScope),
    /// Every node of the label, with its relationships
    Label(String),
    /// Nodes of the label that no relationship touches any more
    SharedLabel(String),
}

impl fmt::Display for PruneScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneScope::Relation(scope) => write!(f, "relationship '{}'", scope),
            PruneScope::Label(label) => write!(f, "label '{}'", label),
            PruneScope::SharedLabel(label) => write!(f, "shared label '{}'", label),
        }
    }
}

/// Number of entities in a scope and how many of them are stale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeCounts {
    pub total: usize,
    pub stale: usize,
}

impl ScopeCounts {
    pub fn stale_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.stale as f64 * 100.0 / self.total as f64
        }
    }
}

/// The two primitives publishing needs (merge and scoped delete) plus the
/// lookups used by extractors and tooling.
pub trait GraphStore: Send + Sync {
    /// Create or update nodes; returns how many were written
    fn merge_nodes(&self, nodes: &[NodeRecord], tag: &RunTag) -> StorageResult<usize>;

    /// Create or update relationships, creating missing endpoints
    fn merge_relations(&self, relations: &[RelationRecord], tag: &RunTag) -> StorageResult<usize>;

    fn scope_counts(&self, scope: &PruneScope, current: &RunTag) -> StorageResult<ScopeCounts>;

    /// Delete everything in `scope` not tagged `current`.
    ///
    /// Pruning a label also removes every relationship touching the pruned
    /// nodes; a shared label only loses stale nodes that are already
    /// detached. Returns the number of nodes (or relationships) removed.
    fn prune(&self, scope: &PruneScope, current: &RunTag) -> StorageResult<usize>;

    fn get_node(&self, label: &str, key: &str) -> StorageResult<Option<StoredNode>>;

    fn nodes_by_label(&self, label: &str) -> StorageResult<Vec<StoredNode>>;

    /// Outgoing edges of a node, both forward and reverse directions
    fn relations_from(&self, label: &str, key: &str) -> StorageResult<Vec<StoredRelation>>;

    fn node_count(&self) -> StorageResult<usize>;

    /// Number of directed edges
    fn relation_count(&self) -> StorageResult<usize>;

    fn flush(&self) -> StorageResult<()>;
}

/// Graph store over any [`StorageDriver`]
pub struct KvGraphStore {
    driver: Box<dyn StorageDriver>,
    nodes: Box<dyn StorageTree>,
    relations: Box<dyn StorageTree>,
}

impl KvGraphStore {
    pub fn new(driver: Box<dyn StorageDriver>) -> StorageResult<Self> {
        let nodes = driver.open_tree(NODES_TREE)?;
        let relations = driver.open_tree(RELATIONS_TREE)?;
        Ok(Self {
            driver,
            nodes,
            relations,
        })
    }

    /// Open a store of the given backend type at `path`
    pub fn open<P: AsRef<Path>>(storage_type: StorageType, path: P) -> StorageResult<Self> {
        let driver: Box<dyn StorageDriver> = match storage_type {
            #[cfg(feature = "sled-backend")]
            StorageType::Sled => Box::new(SledDriver::open(path)?),
            #[cfg(feature = "redb-backend")]
            StorageType::Redb => Box::new(RedbDriver::open(path)?),
            StorageType::Memory => Box::new(MemoryDriver::open(path)?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(StorageError::BackendSpecific(format!(
                    "storage backend '{}' is not compiled in",
                    other
                )))
            }
        };
        debug!("Opened {} graph store", storage_type);
        Self::new(driver)
    }

    pub fn in_memory() -> StorageResult<Self> {
        Self::new(Box::new(MemoryDriver::new()))
    }

    pub fn storage_type(&self) -> StorageType {
        self.driver.storage_type()
    }

    fn read_node(&self, label: &str, key: &str) -> StorageResult<Option<StoredNode>> {
        match self.nodes.get(&node_key(label, key)?)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn all_relations(&self) -> StorageResult<Vec<StoredRelation>> {
        self.relations
            .iter()?
            .map(|entry| entry.and_then(|(_, bytes)| decode(&bytes)))
            .collect()
    }

    /// Keys of an edge and of its paired reverse edge
    fn edge_pair_keys(edge: &StoredRelation) -> StorageResult<[Vec<u8>; 2]> {
        Ok([
            relation_key(
                &edge.start_label,
                &edge.start_key,
                &edge.rel_type,
                &edge.end_label,
                &edge.end_key,
            )?,
            relation_key(
                &edge.end_label,
                &edge.end_key,
                &edge.reverse_type,
                &edge.start_label,
                &edge.start_key,
            )?,
        ])
    }

    /// Stale forward edges of a relationship triple
    fn stale_edges(
        &self,
        scope: &RelationScope,
        current: &RunTag,
    ) -> StorageResult<(usize, Vec<StoredRelation>)> {
        let edges: Vec<StoredRelation> = self
            .all_relations()?
            .into_iter()
            .filter(|edge| scope.matches(&edge.start_label, &edge.rel_type, &edge.end_label))
            .collect();
        let total = edges.len();
        let stale = edges
            .into_iter()
            .filter(|edge| edge.published_tag != current.as_str())
            .collect();
        Ok((total, stale))
    }

    /// Stale nodes of a label; with `detached_only`, those without edges
    fn stale_nodes(
        &self,
        label: &str,
        current: &RunTag,
        detached_only: bool,
    ) -> StorageResult<(usize, Vec<StoredNode>)> {
        let nodes = self.nodes_by_label(label)?;
        let total = nodes.len();
        let mut stale = Vec::new();
        for node in nodes {
            if node.published_tag == current.as_str() {
                continue;
            }
            if detached_only && !self.relations_from(&node.label, &node.key)?.is_empty() {
                continue;
            }
            stale.push(node);
        }
        Ok((total, stale))
    }

    fn remove_nodes(&self, nodes: &[StoredNode]) -> StorageResult<()> {
        let keys = nodes
            .iter()
            .map(|node| node_key(&node.label, &node.key))
            .collect::<StorageResult<Vec<_>>>()?;
        let keys: Vec<&[u8]> = keys.iter().map(Vec::as_slice).collect();
        if !keys.is_empty() {
            self.nodes.batch_remove(&keys)?;
        }
        Ok(())
    }

    fn remove_edges(&self, edges: &[StoredRelation]) -> StorageResult<()> {
        let mut keys: HashSet<Vec<u8>> = HashSet::new();
        for edge in edges {
            keys.extend(Self::edge_pair_keys(edge)?);
        }
        let keys: Vec<&[u8]> = keys.iter().map(Vec::as_slice).collect();
        if !keys.is_empty() {
            self.relations.batch_remove(&keys)?;
        }
        Ok(())
    }
}

impl GraphStore for KvGraphStore {
    fn merge_nodes(&self, nodes: &[NodeRecord], tag: &RunTag) -> StorageResult<usize> {
        // Records repeating a key inside one batch merge into the same entry
        let mut pending: BTreeMap<Vec<u8>, StoredNode> = BTreeMap::new();

        for record in nodes {
            let storage_key = node_key(&record.label, &record.key)?;
            let (mut node, stored) = match pending.remove(&storage_key) {
                Some(node) => (node, false),
                None => (
                    self.read_node(&record.label, &record.key)?
                        .unwrap_or_else(|| StoredNode {
                            label: record.label.clone(),
                            key: record.key.clone(),
                            attributes: BTreeMap::new(),
                            published_tag: String::new(),
                        }),
                    true,
                ),
            };
            for (name, value) in &record.attributes {
                if !value.is_null() {
                    node.attributes.insert(name.clone(), value.clone());
                } else if stored {
                    // Nulls clear what earlier runs wrote, not this batch
                    node.attributes.remove(name);
                }
            }
            node.published_tag = tag.as_str().to_string();
            pending.insert(storage_key, node);
        }

        let entries = pending
            .iter()
            .map(|(k, node)| encode(node).map(|bytes| (k.clone(), bytes)))
            .collect::<StorageResult<Vec<_>>>()?;
        let batch: Vec<(&[u8], &[u8])> = entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
            .collect();
        self.nodes.batch_insert(&batch)?;
        Ok(nodes.len())
    }

    fn merge_relations(&self, relations: &[RelationRecord], tag: &RunTag) -> StorageResult<usize> {
        let mut node_entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        let mut created: HashSet<Vec<u8>> = HashSet::new();
        let mut edge_entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(relations.len() * 2);

        for record in relations {
            // Endpoints are merge-or-create
            for (label, key) in [
                (&record.start_label, &record.start_key),
                (&record.end_label, &record.end_key),
            ] {
                let storage_key = node_key(label, key)?;
                if created.contains(&storage_key) || self.nodes.contains_key(&storage_key)? {
                    continue;
                }
                let stub = StoredNode {
                    label: label.clone(),
                    key: key.clone(),
                    attributes: BTreeMap::new(),
                    published_tag: tag.as_str().to_string(),
                };
                node_entries.push((storage_key.clone(), encode(&stub)?));
                created.insert(storage_key);
            }

            let forward = StoredRelation {
                start_label: record.start_label.clone(),
                start_key: record.start_key.clone(),
                end_label: record.end_label.clone(),
                end_key: record.end_key.clone(),
                rel_type: record.rel_type.clone(),
                reverse_type: record.reverse_type.clone(),
                attributes: record.attributes.clone(),
                published_tag: tag.as_str().to_string(),
            };
            let backward = StoredRelation {
                start_label: record.end_label.clone(),
                start_key: record.end_key.clone(),
                end_label: record.start_label.clone(),
                end_key: record.start_key.clone(),
                rel_type: record.reverse_type.clone(),
                reverse_type: record.rel_type.clone(),
                attributes: record.attributes.clone(),
                published_tag: tag.as_str().to_string(),
            };
            let [forward_key, backward_key] = Self::edge_pair_keys(&forward)?;
            edge_entries.push((forward_key, encode(&forward)?));
            edge_entries.push((backward_key, encode(&backward)?));
        }

        if !node_entries.is_empty() {
            debug!("Creating {} endpoint node(s) for relationships", node_entries.len());
            let batch: Vec<(&[u8], &[u8])> = node_entries
                .iter()
                .map(|(k, v)| (k.as_slice(), v.as_slice()))
                .collect();
            self.nodes.batch_insert(&batch)?;
        }

        let batch: Vec<(&[u8], &[u8])> = edge_entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
            .collect();
        self.relations.batch_insert(&batch)?;
        Ok(relations.len())
    }

    fn scope_counts(&self, scope: &PruneScope, current: &RunTag) -> StorageResult<ScopeCounts> {
        let (total, stale) = match scope {
            PruneScope::Relation(relation) => {
                let (total, stale) = self.stale_edges(relation, current)?;
                (total, stale.len())
            }
            PruneScope::Label(label) => {
                let (total, stale) = self.stale_nodes(label, current, false)?;
                (total, stale.len())
            }
            PruneScope::SharedLabel(label) => {
                let (total, stale) = self.stale_nodes(label, current, true)?;
                (total, stale.len())
            }
        };
        Ok(ScopeCounts { total, stale })
    }

    fn prune(&self, scope: &PruneScope, current: &RunTag) -> StorageResult<usize> {
        match scope {
            PruneScope::Relation(relation) => {
                let (_, stale) = self.stale_edges(relation, current)?;
                self.remove_edges(&stale)?;
                debug!("Pruned {} relationship(s) for {}", stale.len(), scope);
                Ok(stale.len())
            }
            PruneScope::Label(label) => {
                let (_, stale) = self.stale_nodes(label, current, false)?;
                let mut edges = Vec::new();
                for node in &stale {
                    edges.extend(self.relations_from(&node.label, &node.key)?);
                }
                self.remove_edges(&edges)?;
                self.remove_nodes(&stale)?;
                debug!(
                    "Pruned {} node(s) and {} edge(s) for {}",
                    stale.len(),
                    edges.len(),
                    scope
                );
                Ok(stale.len())
            }
            PruneScope::SharedLabel(label) => {
                let (_, stale) = self.stale_nodes(label, current, true)?;
                self.remove_nodes(&stale)?;
                debug!("Pruned {} detached node(s) for {}", stale.len(), scope);
                Ok(stale.len())
            }
        }
    }

    fn get_node(&self, label: &str, key: &str) -> StorageResult<Option<StoredNode>> {
        self.read_node(label, key)
    }

    fn nodes_by_label(&self, label: &str) -> StorageResult<Vec<StoredNode>> {
        let prefix = prefix_of(&[label])?;
        self.nodes
            .scan_prefix(&prefix)?
            .map(|entry| entry.and_then(|(_, bytes)| decode(&bytes)))
            .collect()
    }

    fn relations_from(&self, label: &str, key: &str) -> StorageResult<Vec<StoredRelation>> {
        let prefix = prefix_of(&[label, key])?;
        self.relations
            .scan_prefix(&prefix)?
            .map(|entry| entry.and_then(|(_, bytes)| decode(&bytes)))
            .collect()
    }

    fn node_count(&self) -> StorageResult<usize> {
        let mut count = 0;
        for entry in self.nodes.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn relation_count(&self) -> StorageResult<usize> {
        let mut count = 0;
        for entry in self.relations.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn flush(&self) -> StorageResult<()> {
        self.nodes.flush()?;
        self.relations.flush()?;
        self.driver.flush()
    }
}

fn check_part(part: &str) -> StorageResult<()> {
    if part.is_empty() {
        return Err(StorageError::Rejected(
            "labels, keys and types must not be empty".to_string(),
        ));
    }
    if part.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::Rejected(format!(
            "'{}' contains a reserved separator byte",
            part.escape_debug()
        )));
    }
    Ok(())
}

fn join_parts(parts: &[&str]) -> StorageResult<Vec<u8>> {
    let mut out = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        check_part(part)?;
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.extend_from_slice(part.as_bytes());
    }
    Ok(out)
}

/// Prefix matching every key that starts with `parts`
fn prefix_of(parts: &[&str]) -> StorageResult<Vec<u8>> {
    let mut prefix = join_parts(parts)?;
    prefix.push(SEPARATOR);
    Ok(prefix)
}

fn node_key(label: &str, key: &str) -> StorageResult<Vec<u8>> {
    join_parts(&[label, key])
}

fn relation_key(
    start_label: &str,
    start_key: &str,
    rel_type: &str,
    end_label: &str,
    end_key: &str,
) -> StorageResult<Vec<u8>> {
    join_parts(&[start_label, start_key, rel_type, end_label, end_key])
}

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> StorageResult<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::DeserializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(key: &str) -> NodeRecord {
        NodeRecord::new("Table", key).with_attribute("name", key)
    }

    fn owned_by(table_key: &str, schema: &str) -> RelationRecord {
        RelationRecord::new("Table", table_key, "Schema", schema, "OWNER", "OWNER_OF")
    }

    #[test]
    fn merge_updates_instead_of_duplicating() {
        let store = KvGraphStore::in_memory().unwrap();
        let tag = RunTag::new("run-1");

        store.merge_nodes(&[table("t1")], &tag).unwrap();
        store
            .merge_nodes(&[table("t1").with_attribute("description", "orders")], &tag)
            .unwrap();

        assert_eq!(store.node_count().unwrap(), 1);
        let node = store.get_node("Table", "t1").unwrap().unwrap();
        assert_eq!(node.attributes.get("name"), Some(&Value::from("t1")));
        assert_eq!(node.attributes.get("description"), Some(&Value::from("orders")));
        assert_eq!(node.published_tag, "run-1");
    }

    #[test]
    fn relationship_creates_missing_endpoints_and_both_directions() {
        let store = KvGraphStore::in_memory().unwrap();
        let tag = RunTag::new("run-1");

        store.merge_relations(&[owned_by("t1", "s1")], &tag).unwrap();

        assert!(store.get_node("Table", "t1").unwrap().is_some());
        assert!(store.get_node("Schema", "s1").unwrap().is_some());
        assert_eq!(store.relation_count().unwrap(), 2);

        let back = store.relations_from("Schema", "s1").unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].rel_type, "OWNER_OF");
        assert_eq!(back[0].end_key, "t1");
    }

    #[test]
    fn pruning_a_label_detaches_relationships() {
        let store = KvGraphStore::in_memory().unwrap();
        let old = RunTag::new("run-1");
        let new = RunTag::new("run-2");

        store.merge_nodes(&[table("t1"), table("t2")], &old).unwrap();
        store
            .merge_relations(&[owned_by("t1", "s1"), owned_by("t2", "s1")], &old)
            .unwrap();

        // Second run only sees t1
        store.merge_nodes(&[table("t1")], &new).unwrap();
        store.merge_relations(&[owned_by("t1", "s1")], &new).unwrap();

        let scope = PruneScope::Label("Table".to_string());
        let counts = store.scope_counts(&scope, &new).unwrap();
        assert_eq!(counts, ScopeCounts { total: 2, stale: 1 });

        assert_eq!(store.prune(&scope, &new).unwrap(), 1);
        assert!(store.get_node("Table", "t2").unwrap().is_none());
        assert_eq!(store.relations_from("Schema", "s1").unwrap().len(), 1);
        assert_eq!(store.relation_count().unwrap(), 2);
    }

    #[test]
    fn null_attribute_clears_the_stored_value() {
        let store = KvGraphStore::in_memory().unwrap();
        store
            .merge_nodes(
                &[table("t1").with_attribute("owner", "ops")],
                &RunTag::new("run-1"),
            )
            .unwrap();

        let mut cleared = table("t1");
        cleared.attributes.insert("owner".to_string(), Value::Null);
        store.merge_nodes(&[cleared], &RunTag::new("run-2")).unwrap();

        let node = store.get_node("Table", "t1").unwrap().unwrap();
        assert_eq!(node.attributes.get("owner"), None);
        assert_eq!(node.attributes.get("name"), Some(&Value::from("t1")));
    }

    #[test]
    fn null_later_in_a_batch_keeps_the_batch_value() {
        let store = KvGraphStore::in_memory().unwrap();
        let mut empty = table("t1");
        empty.attributes.insert("owner".to_string(), Value::Null);

        store
            .merge_nodes(
                &[table("t1").with_attribute("owner", "ops"), empty],
                &RunTag::new("run-1"),
            )
            .unwrap();

        let node = store.get_node("Table", "t1").unwrap().unwrap();
        assert_eq!(node.attributes.get("owner"), Some(&Value::from("ops")));
    }

    #[test]
    fn pruning_a_relationship_triple_keeps_nodes_and_other_triples() {
        let store = KvGraphStore::in_memory().unwrap();
        let old = RunTag::new("run-1");
        let new = RunTag::new("run-2");

        store
            .merge_relations(
                &[
                    owned_by("t1", "s1"),
                    RelationRecord::new("Dashboard", "d1", "Schema", "s1", "OWNER", "OWNER_OF"),
                ],
                &old,
            )
            .unwrap();
        store.merge_nodes(&[table("t1")], &new).unwrap();

        let scope = PruneScope::Relation(RelationScope::new("Table", "OWNER", "Schema"));
        assert_eq!(
            store.scope_counts(&scope, &new).unwrap(),
            ScopeCounts { total: 1, stale: 1 }
        );
        assert_eq!(store.prune(&scope, &new).unwrap(), 1);
        assert!(store.relations_from("Table", "t1").unwrap().is_empty());
        assert_eq!(store.relations_from("Dashboard", "d1").unwrap().len(), 1);
        assert_eq!(store.relation_count().unwrap(), 2);
        assert!(store.get_node("Table", "t1").unwrap().is_some());
    }

    #[test]
    fn shared_label_prunes_only_detached_stale_nodes() {
        let store = KvGraphStore::in_memory().unwrap();
        let old = RunTag::new("run-1");
        let new = RunTag::new("run-2");

        // s1 is still referenced, s2 lost its last relationship
        store
            .merge_relations(&[owned_by("t1", "s1"), owned_by("t2", "s2")], &old)
            .unwrap();
        let t2_edges = store.relations_from("Table", "t2").unwrap();
        store.remove_edges(&t2_edges).unwrap();

        let scope = PruneScope::SharedLabel("Schema".to_string());
        assert_eq!(
            store.scope_counts(&scope, &new).unwrap(),
            ScopeCounts { total: 2, stale: 1 }
        );
        assert_eq!(store.prune(&scope, &new).unwrap(), 1);
        assert!(store.get_node("Schema", "s1").unwrap().is_some());
        assert!(store.get_node("Schema", "s2").unwrap().is_none());
    }

    #[test]
    fn keys_with_reserved_bytes_are_rejected() {
        let store = KvGraphStore::in_memory().unwrap();
        let err = store
            .merge_nodes(&[NodeRecord::new("Table", "bad\u{1f}key")], &RunTag::new("r"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
        assert!(!err.is_transient());
    }
}
