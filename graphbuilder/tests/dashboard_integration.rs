// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dashboards loaded from a row file and read back out of the graph

use graphbuilder::{
    Config, CsvBatchStager, DashboardMetadata, DefaultJob, DefaultTask, Extractor, FromRecord,
    FsStaging, GenericExtractor, GraphDashboardExtractor, GraphPublisher, GraphStore,
    InMemoryConnection, JobSummary, KvGraphStore, RawRecord,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ROWS: &str = r#"[
    {"dashboard_group": "finance", "dashboard_name": "revenue",
     "database": "mode", "schema_name": "alice", "description": "Monthly revenue",
     "column_names": ["amount", "region"]},
    {"dashboard_group": "finance", "dashboard_name": "churn",
     "database": "mode", "schema_name": "alice",
     "column_names": ["region"]}
]"#;

fn load_dashboards(
    input: &Path,
    store: Arc<KvGraphStore>,
    staging_dir: &Path,
    config: Config,
) -> JobSummary {
    let connection = InMemoryConnection::from_json_file(input).expect("rows should parse");
    let staging = Arc::new(FsStaging::new(staging_dir));
    let task = DefaultTask::new(
        GenericExtractor::<DashboardMetadata>::new(Box::new(connection)),
        CsvBatchStager::new(staging.clone()),
    );
    DefaultJob::new(config, task, GraphPublisher::new(store, staging))
        .launch()
        .expect("job should succeed")
}

fn read_back(store: Arc<KvGraphStore>, tag: Option<&str>) -> Vec<RawRecord> {
    let mut config = Config::new();
    if let Some(tag) = tag {
        config.put("published_tag", tag);
    }
    let mut extractor = GraphDashboardExtractor::new(store);
    extractor.init(&config).unwrap();
    let mut records = Vec::new();
    while let Some(record) = extractor.extract().unwrap() {
        records.push(record);
    }
    extractor.close().unwrap();
    records
}

#[test]
fn dashboards_round_trip_through_the_graph() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = temp_dir.path().join("dashboards.json");
    std::fs::write(&input, ROWS).unwrap();
    let store = Arc::new(KvGraphStore::in_memory().unwrap());

    let summary = load_dashboards(
        &input,
        store.clone(),
        &temp_dir.path().join("staging"),
        Config::from_pairs([("publisher.graph.job_publish_tag", "run_1")]),
    );
    assert_eq!(summary.task.entities, 2);

    // Shared owner, database, group and column-name tag
    assert_eq!(store.nodes_by_label("Schema").unwrap().len(), 1);
    assert_eq!(store.nodes_by_label("Database").unwrap().len(), 1);
    assert_eq!(store.nodes_by_label("Dashboardgroup").unwrap().len(), 1);
    assert_eq!(store.nodes_by_label("Tag").unwrap().len(), 2);

    let mut read: Vec<DashboardMetadata> = read_back(store, None)
        .iter()
        .map(|record| DashboardMetadata::from_record(record).unwrap())
        .collect();
    read.sort_by(|a, b| a.key().cmp(&b.key()));

    let expected = vec![
        DashboardMetadata::new("churn", "finance")
            .unwrap()
            .with_database(Some("mode".to_string()))
            .with_schema_name(Some("alice".to_string()))
            .with_column_names(vec!["region".to_string()]),
        DashboardMetadata::new("revenue", "finance")
            .unwrap()
            .with_database(Some("mode".to_string()))
            .with_schema_name(Some("alice".to_string()))
            .with_description(Some("Monthly revenue".to_string()))
            .with_column_names(vec!["amount".to_string(), "region".to_string()]),
    ];
    assert_eq!(read, expected);
}

#[test]
fn only_dashboards_of_the_requested_run_are_read() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = temp_dir.path().join("dashboards.json");
    std::fs::write(&input, ROWS).unwrap();
    let store = Arc::new(KvGraphStore::in_memory().unwrap());
    let staging_dir = temp_dir.path().join("staging");

    load_dashboards(
        &input,
        store.clone(),
        &staging_dir,
        Config::from_pairs([("publisher.graph.job_publish_tag", "run_1")]),
    );

    // A second run that refreshes nothing and keeps stale entities
    std::fs::write(&input, "[]").unwrap();
    let summary = load_dashboards(
        &input,
        store.clone(),
        &staging_dir,
        Config::from_pairs([
            ("publisher.graph.job_publish_tag", "run_2"),
            ("publisher.graph.prune", "false"),
        ]),
    );
    assert_eq!(summary.task.entities, 0);

    assert_eq!(read_back(store.clone(), Some("run_1")).len(), 2);
    assert!(read_back(store, Some("run_2")).is_empty());
}
