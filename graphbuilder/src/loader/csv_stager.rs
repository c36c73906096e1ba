// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Batch stager writing one CSV file per label and relationship type

use super::csv_batch::BatchBuilder;
use super::{Loader, StageError, StageSummary};
use crate::config::Config;
use crate::models::GraphEmitter;
use crate::staging::StagingStore;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SCOPE: &str = "loader.csv_stager";
/// Remove batches left over from an earlier run before staging
pub const CLEAR_STAGING_KEY: &str = "clear_staging";

pub struct CsvBatchStager {
    staging: Arc<dyn StagingStore>,
    nodes: BTreeMap<String, BatchBuilder>,
    relations: BTreeMap<(String, String, String), BatchBuilder>,
}

impl CsvBatchStager {
    pub fn new(staging: Arc<dyn StagingStore>) -> Self {
        Self {
            staging,
            nodes: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn buffered_nodes(&self) -> usize {
        self.nodes.values().map(BatchBuilder::len).sum()
    }

    pub fn buffered_relations(&self) -> usize {
        self.relations.values().map(BatchBuilder::len).sum()
    }
}

impl Loader for CsvBatchStager {
    fn init(&mut self, config: &Config) -> Result<(), StageError> {
        self.nodes.clear();
        self.relations.clear();
        if config.get_bool_or(CLEAR_STAGING_KEY, true)? {
            self.staging.clear()?;
        }
        Ok(())
    }

    fn load(&mut self, emitter: &mut GraphEmitter<'_>) -> Result<(), StageError> {
        while let Some(node) = emitter.next_node() {
            self.nodes
                .entry(node.label.clone())
                .or_insert_with(|| BatchBuilder::for_label(&node.label))
                .push_node(node);
        }
        while let Some(relation) = emitter.next_relation() {
            let group = (
                relation.start_label.clone(),
                relation.rel_type.clone(),
                relation.end_label.clone(),
            );
            self.relations
                .entry(group)
                .or_insert_with(|| {
                    BatchBuilder::for_relation(
                        &relation.start_label,
                        &relation.rel_type,
                        &relation.end_label,
                    )
                })
                .push_relation(relation);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<StageSummary, StageError> {
        let summary = StageSummary {
            node_batches: self.nodes.len(),
            relation_batches: self.relations.len(),
            nodes: self.buffered_nodes(),
            relations: self.buffered_relations(),
        };

        for batch in self.nodes.values().chain(self.relations.values()) {
            self.staging.write(batch.name(), &batch.encode()?)?;
            debug!("Staged {} record(s) to {}", batch.len(), batch.name());
        }
        self.nodes.clear();
        self.relations.clear();

        info!(
            "Staged {} node(s) in {} batch(es) and {} relationship(s) in {} batch(es)",
            summary.nodes, summary.node_batches, summary.relations, summary.relation_batches
        );
        Ok(summary)
    }

    fn scope(&self) -> &'static str {
        SCOPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DashboardMetadata, DedupSet};
    use crate::staging::{MemoryStaging, NODES_DIR, RELATIONSHIPS_DIR};

    fn stage(staging: Arc<MemoryStaging>, dashboards: &[DashboardMetadata]) -> StageSummary {
        let mut stager = CsvBatchStager::new(staging);
        stager.init(&Config::new()).unwrap();
        let mut dedup = DedupSet::new();
        for dashboard in dashboards {
            let mut emitter = GraphEmitter::new(dashboard, &mut dedup);
            stager.load(&mut emitter).unwrap();
        }
        stager.close().unwrap()
    }

    #[test]
    fn one_batch_per_label_and_relationship_type() {
        let staging = Arc::new(MemoryStaging::new());
        let dashboards = vec![
            DashboardMetadata::new("d1", "finance")
                .unwrap()
                .with_schema_name(Some("s1".to_string())),
            DashboardMetadata::new("d2", "finance")
                .unwrap()
                .with_schema_name(Some("s1".to_string())),
        ];
        let summary = stage(staging.clone(), &dashboards);

        assert_eq!(
            staging.list(NODES_DIR).unwrap(),
            vec![
                "nodes/Dashboard.csv",
                "nodes/Dashboardgroup.csv",
                "nodes/Schema.csv"
            ]
        );
        assert_eq!(
            staging.list(RELATIONSHIPS_DIR).unwrap(),
            vec![
                "relationships/Dashboard_DASHBOARD_OF_Dashboardgroup.csv",
                "relationships/Dashboard_OWNER_Schema.csv"
            ]
        );
        assert_eq!(summary.relations, 4);
    }

    #[test]
    fn init_clears_previous_batches() {
        let staging = Arc::new(MemoryStaging::new());
        staging.write("nodes/Stale.csv", b"KEY,LABEL\n").unwrap();

        stage(
            staging.clone(),
            &[DashboardMetadata::new("d1", "finance").unwrap()],
        );
        assert!(!staging
            .list(NODES_DIR)
            .unwrap()
            .contains(&"nodes/Stale.csv".to_string()));
    }
}
