// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pipeline driver
//!
//! A [`DefaultJob`] runs one [`DefaultTask`] (extract, emit, stage) and then
//! publishes what was staged. Every launch gets a fresh [`RunContext`], so
//! duplicate suppression never leaks from one run into the next, and
//! everything the run writes is stamped with the context's tag. The
//! publisher prunes only the scopes the job's entity kind declares.

pub mod task;

use crate::config::Config;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::loader::Loader;
use crate::models::{DedupSet, GraphSerializable, RunTag};
use crate::publisher::{GraphPublisher, PublishSummary};
use log::info;
use std::time::Instant;

pub use task::{DefaultTask, TaskSummary};

pub const SCOPE: &str = "job";
/// Abort on the first entity that cannot be built
pub const STRICT: &str = "strict";
/// Suppress repeated nodes as well as repeated relationships
pub const DEDUP_NODES: &str = "dedup_nodes";

/// State owned by one publishing run
#[derive(Debug)]
pub struct RunContext {
    tag: RunTag,
    dedup: DedupSet,
}

impl RunContext {
    pub fn new(tag: RunTag, track_nodes: bool) -> Self {
        let dedup = if track_nodes {
            DedupSet::with_node_tracking()
        } else {
            DedupSet::new()
        };
        Self { tag, dedup }
    }

    pub fn tag(&self) -> &RunTag {
        &self.tag
    }

    pub fn dedup_mut(&mut self) -> &mut DedupSet {
        &mut self.dedup
    }
}

/// Outcome of one job launch
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub task: TaskSummary,
    pub publish: PublishSummary,
    pub elapsed_ms: u128,
}

pub struct DefaultJob<E, L> {
    config: Config,
    task: DefaultTask<E, L>,
    publisher: GraphPublisher,
}

impl<E, L> DefaultJob<E, L>
where
    E: Extractor,
    E::Item: GraphSerializable,
    L: Loader,
{
    pub fn new(config: Config, task: DefaultTask<E, L>, publisher: GraphPublisher) -> Self {
        Self {
            config,
            task,
            publisher,
        }
    }

    /// Extract, stage and publish once.
    ///
    /// Every component is initialized before the first record is read, so
    /// configuration errors never leave a half-staged run behind.
    pub fn launch(&mut self) -> Result<JobSummary> {
        let started = Instant::now();
        let job_config = self.config.scoped(SCOPE);
        let strict = job_config.get_bool_or(STRICT, false)?;
        let track_nodes = job_config.get_bool_or(DEDUP_NODES, false)?;

        self.publisher
            .init(&self.config.scoped(self.publisher.scope()))?;
        self.publisher.declare_ownership(E::Item::owned_scopes());
        self.task.set_strict(strict);
        self.task.init(&self.config)?;

        let tag = match self.publisher.config() {
            Some(config) => config.tag.clone(),
            None => return Err(crate::publisher::PublishError::NotInitialized.into()),
        };
        info!("Launching job with tag '{}'", tag);

        let mut context = RunContext::new(tag, track_nodes);
        let task = self.task.run(&mut context)?;
        let publish = self.publisher.publish_as(context.tag())?;

        let summary = JobSummary {
            task,
            publish,
            elapsed_ms: started.elapsed().as_millis(),
        };
        info!(
            "Job finished in {} ms: {} entities, {} skipped",
            summary.elapsed_ms, summary.task.entities, summary.task.skipped_entities
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{GenericExtractor, InMemoryConnection, SqlTableMetadataExtractor};
    use crate::loader::CsvBatchStager;
    use crate::models::DashboardMetadata;
    use crate::staging::MemoryStaging;
    use crate::storage::{GraphStore, KvGraphStore};
    use crate::value::RawRecord;
    use std::sync::Arc;

    fn dashboard_row(name: &str, schema: &str) -> RawRecord {
        RawRecord::new()
            .with("dashboard_name", name)
            .with("dashboard_group", "finance")
            .with("schema_name", schema)
    }

    fn dashboard_job(
        rows: Vec<RawRecord>,
        store: Arc<KvGraphStore>,
        config: Config,
    ) -> DefaultJob<GenericExtractor<DashboardMetadata>, CsvBatchStager> {
        let staging = Arc::new(MemoryStaging::new());
        let extractor = GenericExtractor::new(Box::new(InMemoryConnection::new(rows)));
        let task = DefaultTask::new(extractor, CsvBatchStager::new(staging.clone()));
        DefaultJob::new(config, task, GraphPublisher::new(store, staging))
    }

    fn tagged(tag: &str) -> Config {
        Config::from_pairs([("publisher.graph.job_publish_tag", tag)])
    }

    #[test]
    fn two_dashboards_share_one_owner_node() {
        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let mut job = dashboard_job(
            vec![dashboard_row("d1", "s1"), dashboard_row("d2", "s1")],
            store.clone(),
            tagged("run-1"),
        );
        let summary = job.launch().unwrap();

        assert_eq!(summary.task.entities, 2);
        assert_eq!(store.nodes_by_label("Schema").unwrap().len(), 1);
        let owners = store.relations_from("Schema", "s1").unwrap();
        assert_eq!(owners.len(), 2);
        assert!(owners.iter().all(|r| r.rel_type == "OWNER_OF"));
    }

    #[test]
    fn bad_entities_are_skipped_unless_strict() {
        let rows = vec![
            dashboard_row("d1", "s1"),
            RawRecord::new().with("dashboard_name", "orphan"),
            dashboard_row("d2", "s1"),
        ];

        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let summary = dashboard_job(rows.clone(), store, tagged("run-1"))
            .launch()
            .unwrap();
        assert_eq!(summary.task.entities, 2);
        assert_eq!(summary.task.skipped_entities, 1);

        let mut config = tagged("run-1");
        config.put("job.strict", "true");
        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let err = dashboard_job(rows, store.clone(), config)
            .launch()
            .unwrap_err();
        assert!(err.is_entity_scoped());
        assert_eq!(store.node_count().unwrap(), 0);
    }

    #[test]
    fn missing_tag_fails_before_extraction() {
        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let mut job = dashboard_job(vec![dashboard_row("d1", "s1")], store.clone(), Config::new());

        assert!(matches!(job.launch(), Err(crate::Error::Publish(_))));
        assert_eq!(store.node_count().unwrap(), 0);
    }

    #[test]
    fn table_job_reads_its_scope() {
        let rows = vec![RawRecord::new()
            .with("schema_name", "s1")
            .with("table_name", "t1")
            .with("col_name", "a")
            .with("col_sort_order", 1i64)];
        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let staging = Arc::new(MemoryStaging::new());
        let task = DefaultTask::new(
            SqlTableMetadataExtractor::new(Box::new(InMemoryConnection::new(rows))),
            CsvBatchStager::new(staging.clone()),
        );
        let mut config = tagged("run-1");
        config.put("extractor.sql_table.dialect", "oracle");
        config.put("extractor.sql_table.cluster", "prod");

        DefaultJob::new(config, task, GraphPublisher::new(store.clone(), staging))
            .launch()
            .unwrap();
        assert!(store
            .get_node("Table", "oracle://prod.s1/t1")
            .unwrap()
            .is_some());
    }
}
