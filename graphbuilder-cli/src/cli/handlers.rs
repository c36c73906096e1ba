// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for GraphBuilder

use colored::Colorize;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::commands::{EntityKind, LoadArgs, OutputFormat};
use super::output::ResultFormatter;
use graphbuilder::extractor::graph_dashboard;
use graphbuilder::job;
use graphbuilder::publisher;
use graphbuilder::{
    Config, CsvBatchStager, DashboardMetadata, DefaultJob, DefaultTask, Extractor, FsStaging,
    GenericExtractor, GraphDashboardExtractor, GraphPublisher, GraphSerializable, GraphStore,
    InMemoryConnection, JobSummary, KvGraphStore, RawRecord, RunTag, SqlTableMetadataExtractor,
    StorageType,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Handle the load command
///
/// Returns whether the publish completed, which includes every prune scope.
pub fn handle_load(args: LoadArgs) -> CliResult<bool> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::new(),
    };

    let tag_key = format!("{}.{}", publisher::SCOPE, publisher::JOB_PUBLISH_TAG);
    if let Some(tag) = &args.tag {
        config.put(tag_key.as_str(), tag.as_str());
    } else if !config.contains(&tag_key) {
        config.put(tag_key.as_str(), RunTag::generate().as_str());
    }
    if args.no_prune {
        config.put(format!("{}.{}", publisher::SCOPE, publisher::PRUNE), "false");
    }
    if args.strict {
        config.put(format!("{}.{}", job::SCOPE, job::STRICT), "true");
    }

    let staging_dir = args
        .staging
        .clone()
        .unwrap_or_else(|| args.db.join("staging"));
    let store = open_store(&args.db, args.storage, true)?;
    let staging = Arc::new(FsStaging::new(&staging_dir));
    let connection = Box::new(InMemoryConnection::from_json_file(&args.input)?);

    println!(
        "{}",
        format!("Loading {:?} rows from {:?}...", args.kind, args.input)
            .bold()
            .green()
    );

    let summary = match args.kind {
        EntityKind::Table => run_job(
            config,
            SqlTableMetadataExtractor::new(connection),
            staging,
            store,
        )?,
        EntityKind::Dashboard => run_job(
            config,
            GenericExtractor::<DashboardMetadata>::new(connection),
            staging,
            store,
        )?,
    };

    println!("{}", ResultFormatter::format_job(&summary));
    let complete = summary.publish.is_complete();
    if complete {
        println!("{}", "Publish complete".green());
    } else {
        eprintln!(
            "{}",
            format!(
                "{} prune scope(s) failed; stale entities remain",
                summary.publish.failed_scopes.len()
            )
            .red()
        );
    }
    Ok(complete)
}

/// Handle the show command
pub fn handle_show(
    db: PathBuf,
    label: String,
    storage: StorageType,
    format: OutputFormat,
) -> CliResult<()> {
    let store = open_store(&db, storage, false)?;
    let nodes = store.nodes_by_label(&label)?;
    println!("{}", ResultFormatter::format_nodes(&nodes, format));
    Ok(())
}

/// Handle the dashboards command
pub fn handle_dashboards(
    db: PathBuf,
    tag: Option<String>,
    storage: StorageType,
    format: OutputFormat,
) -> CliResult<()> {
    let store = open_store(&db, storage, false)?;
    let mut config = Config::new();
    if let Some(tag) = tag {
        config.put(graph_dashboard::PUBLISHED_TAG_KEY, tag);
    }

    let mut extractor = GraphDashboardExtractor::new(store);
    extractor.init(&config)?;
    let mut records: Vec<RawRecord> = Vec::new();
    while let Some(record) = extractor.extract()? {
        records.push(record);
    }
    extractor.close()?;

    println!("{}", ResultFormatter::format_records(&records, format));
    Ok(())
}

fn run_job<E>(
    config: Config,
    extractor: E,
    staging: Arc<FsStaging>,
    store: Arc<KvGraphStore>,
) -> CliResult<JobSummary>
where
    E: Extractor,
    E::Item: GraphSerializable,
{
    let task = DefaultTask::new(extractor, CsvBatchStager::new(staging.clone()));
    let publisher = GraphPublisher::new(store, staging);
    let mut job = DefaultJob::new(config, task, publisher);
    Ok(job.launch()?)
}

/// Open the graph store under `db`
///
/// Sled keeps its files in `<db>/graph`; redb keeps one file inside `<db>`.
fn open_store(db: &Path, storage: StorageType, create: bool) -> CliResult<Arc<KvGraphStore>> {
    if storage != StorageType::Memory && !db.exists() {
        if !create {
            return Err(format!(
                "Database not found at {:?}. Run 'graphbuilder load' first.",
                db
            )
            .into());
        }
        std::fs::create_dir_all(db)?;
    }

    let path = match storage {
        StorageType::Sled => db.join("graph"),
        StorageType::Redb | StorageType::Memory => db.to_path_buf(),
    };
    info!("Opening {} graph store at {:?}", storage, path);
    Ok(Arc::new(KvGraphStore::open(storage, path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rows(dir: &Path, rows: &str) -> PathBuf {
        let input = dir.join("rows.json");
        std::fs::write(&input, rows).unwrap();
        input
    }

    fn load_args(dir: &Path, input: PathBuf, kind: EntityKind, tag: &str) -> LoadArgs {
        LoadArgs {
            kind,
            input,
            db: dir.join("db"),
            storage: StorageType::Redb,
            staging: None,
            tag: Some(tag.to_string()),
            config: None,
            no_prune: false,
            strict: false,
        }
    }

    #[test]
    fn load_then_read_dashboards_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_rows(
            dir.path(),
            r#"[
                {"dashboard_group": "g", "dashboard_name": "d1", "schema_name": "alice"},
                {"dashboard_group": "g", "dashboard_name": "d2", "schema_name": "alice"}
            ]"#,
        );

        let args = load_args(dir.path(), input, EntityKind::Dashboard, "run_1");
        assert!(handle_load(args).unwrap());

        let store = open_store(&dir.path().join("db"), StorageType::Redb, false).unwrap();
        assert_eq!(store.nodes_by_label("Dashboard").unwrap().len(), 2);
        assert_eq!(store.nodes_by_label("Schema").unwrap().len(), 1);
        assert!(dir.path().join("db/staging/nodes/Dashboard.csv").exists());
    }

    #[test]
    fn table_rows_are_grouped_and_published() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_rows(
            dir.path(),
            r#"[
                {"cluster": "gold", "schema_name": "s", "name": "orders", "col_name": "id",
                 "col_type": "int", "col_sort_order": 0},
                {"cluster": "gold", "schema_name": "s", "name": "orders", "col_name": "total",
                 "col_type": "double", "col_sort_order": 1}
            ]"#,
        );
        let conf = dir.path().join("conf.json");
        std::fs::write(
            &conf,
            r#"{"extractor": {"sql_table": {"database": "hive"}}}"#,
        )
        .unwrap();

        let mut args = load_args(dir.path(), input, EntityKind::Table, "run_1");
        args.config = Some(conf);
        assert!(handle_load(args).unwrap());

        let store = open_store(&dir.path().join("db"), StorageType::Redb, false).unwrap();
        assert_eq!(store.nodes_by_label("Table").unwrap().len(), 1);
        assert_eq!(store.nodes_by_label("Column").unwrap().len(), 2);
    }

    #[test]
    fn showing_a_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = handle_show(
            dir.path().join("absent"),
            "Table".to_string(),
            StorageType::Redb,
            OutputFormat::Table,
        );
        assert!(result.is_err());
    }
}
