// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Run-scoped duplicate suppression

use super::records::{NodeRecord, RelationKey, RelationRecord};
use super::{GraphSerializable, NodeIter, RelationIter};
use std::collections::HashSet;

/// Relationships (and optionally nodes) already emitted in the current run.
///
/// One set belongs to one run. It is created empty when the run starts and
/// dropped when the run ends; independent runs never share a set.
#[derive(Debug, Default)]
pub struct DedupSet {
    relations: HashSet<RelationKey>,
    nodes: Option<HashSet<(String, String)>>,
}

impl DedupSet {
    /// Track relationships only. Nodes are left to idempotent merging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track nodes as well, by `(label, key)`
    pub fn with_node_tracking() -> Self {
        Self {
            relations: HashSet::new(),
            nodes: Some(HashSet::new()),
        }
    }

    /// Record a relationship; `false` if it was already emitted
    pub fn first_relation(&mut self, relation: &RelationRecord) -> bool {
        self.relations.insert(relation.dedup_key())
    }

    /// Record a node; always `true` when nodes are not tracked
    pub fn first_node(&mut self, node: &NodeRecord) -> bool {
        match self.nodes.as_mut() {
            Some(seen) => seen.insert((node.label.clone(), node.key.clone())),
            None => true,
        }
    }

    pub fn tracks_nodes(&self) -> bool {
        self.nodes.is_some()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn clear(&mut self) {
        self.relations.clear();
        if let Some(nodes) = self.nodes.as_mut() {
            nodes.clear();
        }
    }
}

/// Pull-style reader over one entity's nodes and relationships.
///
/// Both sequences are single pass: once `next_node` or `next_relation`
/// returns `None` it keeps returning `None`.
pub struct GraphEmitter<'a> {
    nodes: NodeIter<'a>,
    relations: RelationIter<'a>,
    dedup: &'a mut DedupSet,
    suppressed_nodes: usize,
    suppressed_relations: usize,
}

impl<'a> GraphEmitter<'a> {
    pub fn new<E: GraphSerializable + ?Sized>(entity: &'a E, dedup: &'a mut DedupSet) -> Self {
        Self {
            nodes: Box::new(entity.nodes().fuse()),
            relations: Box::new(entity.relations().fuse()),
            dedup,
            suppressed_nodes: 0,
            suppressed_relations: 0,
        }
    }

    pub fn next_node(&mut self) -> Option<NodeRecord> {
        loop {
            let node = self.nodes.next()?;
            if self.dedup.first_node(&node) {
                return Some(node);
            }
            self.suppressed_nodes += 1;
        }
    }

    pub fn next_relation(&mut self) -> Option<RelationRecord> {
        loop {
            let relation = self.relations.next()?;
            if self.dedup.first_relation(&relation) {
                return Some(relation);
            }
            self.suppressed_relations += 1;
        }
    }

    pub fn suppressed_nodes(&self) -> usize {
        self.suppressed_nodes
    }

    pub fn suppressed_relations(&self) -> usize {
        self.suppressed_relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DashboardMetadata;

    fn dashboard(name: &str, schema: &str) -> DashboardMetadata {
        DashboardMetadata::new(name, "sales")
            .unwrap()
            .with_schema_name(Some(schema.to_string()))
    }

    fn drain(entity: &DashboardMetadata, dedup: &mut DedupSet) -> (Vec<NodeRecord>, Vec<RelationRecord>) {
        let mut emitter = GraphEmitter::new(entity, dedup);
        let nodes = std::iter::from_fn(|| emitter.next_node()).collect();
        let relations = std::iter::from_fn(|| emitter.next_relation()).collect();
        (nodes, relations)
    }

    #[test]
    fn shared_owner_gets_one_relationship_per_entity() {
        let mut dedup = DedupSet::new();
        let (_, first) = drain(&dashboard("d1", "s1"), &mut dedup);
        let (_, second) = drain(&dashboard("d2", "s1"), &mut dedup);

        let owners: Vec<_> = first
            .iter()
            .chain(second.iter())
            .filter(|r| r.rel_type == "OWNER")
            .collect();
        assert_eq!(owners.len(), 2);
        assert!(owners.iter().all(|r| r.end_key == "s1"));
        assert_ne!(owners[0].start_key, owners[1].start_key);
    }

    #[test]
    fn re_emitting_an_entity_in_the_same_run_yields_no_relationships() {
        let mut dedup = DedupSet::new();
        let entity = dashboard("d1", "s1");

        let (nodes_once, relations_once) = drain(&entity, &mut dedup);
        let (nodes_twice, relations_twice) = drain(&entity, &mut dedup);

        assert!(!relations_once.is_empty());
        assert!(relations_twice.is_empty());
        // Nodes are not tracked by default and rely on idempotent merge
        assert_eq!(nodes_once, nodes_twice);
    }

    #[test]
    fn fresh_run_reproduces_identical_records() {
        let entity = dashboard("d1", "s1");

        let first = drain(&entity, &mut DedupSet::new());
        let second = drain(&entity, &mut DedupSet::new());
        assert_eq!(first, second);
    }

    #[test]
    fn node_tracking_suppresses_shared_nodes() {
        let mut dedup = DedupSet::with_node_tracking();
        let (first, _) = drain(&dashboard("d1", "s1"), &mut dedup);
        let (second, _) = drain(&dashboard("d2", "s1"), &mut dedup);

        assert!(first.iter().any(|n| n.label == "Schema"));
        assert!(!second.iter().any(|n| n.label == "Schema"));
        assert!(!second.iter().any(|n| n.label == "Dashboardgroup"));
    }

    #[test]
    fn exhausted_sequences_stay_exhausted() {
        let mut dedup = DedupSet::new();
        let entity = dashboard("d1", "s1");
        let mut emitter = GraphEmitter::new(&entity, &mut dedup);

        while emitter.next_node().is_some() {}
        assert!(emitter.next_node().is_none());
        assert!(emitter.next_node().is_none());
    }
}
