// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Rendering of run summaries and graph contents

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use graphbuilder::storage::StoredNode;
use graphbuilder::{JobSummary, RawRecord, Value};

use super::commands::OutputFormat;

pub struct ResultFormatter;

impl ResultFormatter {
    /// Two-column overview of a finished job
    pub fn format_job(summary: &JobSummary) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec![header("Metric"), header("Value")]);

        let task = &summary.task;
        let publish = &summary.publish;
        let rows: Vec<(&str, String)> = vec![
            ("publish tag", publish.tag.to_string()),
            ("entities", task.entities.to_string()),
            ("skipped entities", task.skipped_entities.to_string()),
            ("skipped records", task.skipped_records.to_string()),
            ("duplicate nodes", task.suppressed_nodes.to_string()),
            ("duplicate relationships", task.suppressed_relations.to_string()),
            ("node batches", publish.node_batches.to_string()),
            ("relationship batches", publish.relation_batches.to_string()),
            ("nodes merged", publish.nodes_merged.to_string()),
            ("relationships merged", publish.relations_merged.to_string()),
            ("pruned", publish.total_pruned().to_string()),
            ("elapsed (ms)", summary.elapsed_ms.to_string()),
        ];
        for (metric, value) in rows {
            table.add_row(vec![Cell::new(metric), Cell::new(value)]);
        }

        let mut out = table.to_string();
        for (scope, removed) in publish.pruned.iter().filter(|(_, n)| *n > 0) {
            out.push_str(&format!("\n  pruned {} from {}", removed, scope));
        }
        for failure in &publish.failed_scopes {
            out.push_str(&format!("\n{}", format!("  {}", failure).red()));
        }
        out
    }

    pub fn format_nodes(nodes: &[StoredNode], format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&nodes.iter().map(node_json).collect::<Vec<_>>())
                    .unwrap_or_default()
            }
            OutputFormat::Table => {
                if nodes.is_empty() {
                    return "No nodes found".yellow().to_string();
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL).set_header(vec![
                    header("key"),
                    header("published_tag"),
                    header("attributes"),
                ]);
                for node in nodes {
                    let attributes: Vec<String> = node
                        .attributes
                        .iter()
                        .map(|(name, value)| format!("{}={}", name, value))
                        .collect();
                    table.add_row(vec![
                        Cell::new(&node.key),
                        Cell::new(&node.published_tag),
                        Cell::new(attributes.join(", ")),
                    ]);
                }
                format!("{}\n{} node(s)", table, nodes.len())
            }
        }
    }

    pub fn format_records(records: &[RawRecord], format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(
                &records.iter().map(record_json).collect::<Vec<_>>(),
            )
            .unwrap_or_default(),
            OutputFormat::Table => {
                if records.is_empty() {
                    return "No dashboards found".yellow().to_string();
                }
                // Union of field names in first-seen order
                let mut columns: Vec<&String> = Vec::new();
                for record in records {
                    for (field, _) in record.fields() {
                        if !columns.contains(&field) {
                            columns.push(field);
                        }
                    }
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_header(columns.iter().map(|c| header(c)).collect::<Vec<_>>());
                for record in records {
                    table.add_row(
                        columns
                            .iter()
                            .map(|c| {
                                Cell::new(record.get(c).map(Value::to_string).unwrap_or_default())
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                format!("{}\n{} dashboard(s)", table, records.len())
            }
        }
    }
}

fn header(name: &str) -> Cell {
    Cell::new(name).fg(Color::Cyan)
}

fn node_json(node: &StoredNode) -> serde_json::Value {
    let attributes: serde_json::Map<String, serde_json::Value> = node
        .attributes
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::Value::from(value)))
        .collect();
    serde_json::json!({
        "label": node.label,
        "key": node.key,
        "published_tag": node.published_tag,
        "attributes": attributes,
    })
}

fn record_json(record: &RawRecord) -> serde_json::Value {
    serde_json::Value::Object(
        record
            .fields()
            .map(|(field, value)| (field.clone(), serde_json::Value::from(value)))
            .collect(),
    )
}
