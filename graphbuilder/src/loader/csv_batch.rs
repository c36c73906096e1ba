// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CSV layout of staged batches
//!
//! A node batch holds one label, a relationship batch one
//! `(start label, type, end label)` triple. Reserved columns (`KEY`,
//! `LABEL`, `START_KEY`, ...) come first and carry no type. Attribute
//! columns follow in the order they were first seen, with a `name:kind`
//! header cell so values can be parsed back. Attributes a row lacks are
//! written as empty cells. In node batches an empty cell decodes to an
//! explicit `Null`, which clears a previously stored attribute.

use super::StageError;
use crate::models::records::*;
use crate::staging::{NODES_DIR, RELATIONSHIPS_DIR};
use crate::value::{Value, ValueKind};
use log::warn;
use std::collections::{BTreeMap, HashMap};

const NODE_COLUMNS: &[&str] = &[NODE_KEY, NODE_LABEL];
const RELATION_COLUMNS: &[&str] = &[
    RELATION_START_LABEL,
    RELATION_START_KEY,
    RELATION_END_LABEL,
    RELATION_END_KEY,
    RELATION_TYPE,
    RELATION_REVERSE_TYPE,
];

pub fn node_batch_name(label: &str) -> String {
    format!("{}/{}.csv", NODES_DIR, label)
}

pub fn relation_batch_name(start_label: &str, rel_type: &str, end_label: &str) -> String {
    format!("{}/{}_{}_{}.csv", RELATIONSHIPS_DIR, start_label, rel_type, end_label)
}

#[derive(Debug)]
struct AttributeColumn {
    name: String,
    kind: ValueKind,
    conflicted: bool,
}

/// Rows of one batch, buffered until the header is final
#[derive(Debug)]
pub struct BatchBuilder {
    name: String,
    reserved: &'static [&'static str],
    columns: Vec<AttributeColumn>,
    positions: HashMap<String, usize>,
    rows: Vec<(Vec<String>, BTreeMap<String, Value>)>,
}

impl BatchBuilder {
    fn new(name: String, reserved: &'static [&'static str]) -> Self {
        Self {
            name,
            reserved,
            columns: Vec::new(),
            positions: HashMap::new(),
            rows: Vec::new(),
        }
    }

    pub fn for_label(label: &str) -> Self {
        Self::new(node_batch_name(label), NODE_COLUMNS)
    }

    pub fn for_relation(start_label: &str, rel_type: &str, end_label: &str) -> Self {
        Self::new(
            relation_batch_name(start_label, rel_type, end_label),
            RELATION_COLUMNS,
        )
    }

    /// Staging name of the batch
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_node(&mut self, node: NodeRecord) {
        self.push(vec![node.key, node.label], node.attributes);
    }

    pub fn push_relation(&mut self, relation: RelationRecord) {
        self.push(
            vec![
                relation.start_label,
                relation.start_key,
                relation.end_label,
                relation.end_key,
                relation.rel_type,
                relation.reverse_type,
            ],
            relation.attributes,
        );
    }

    fn push(&mut self, reserved: Vec<String>, attributes: BTreeMap<String, Value>) {
        for (name, value) in &attributes {
            self.observe(name, value);
        }
        self.rows.push((reserved, attributes));
    }

    fn observe(&mut self, name: &str, value: &Value) {
        let Some(kind) = value.kind() else {
            return;
        };
        match self.positions.get(name) {
            None => {
                self.positions.insert(name.to_string(), self.columns.len());
                self.columns.push(AttributeColumn {
                    name: name.to_string(),
                    kind,
                    conflicted: false,
                });
            }
            Some(&position) => {
                let column = &mut self.columns[position];
                if column.kind != kind && !column.conflicted {
                    warn!(
                        "Attribute '{}' in {} is both {} and {}; writing it as text",
                        name,
                        self.name,
                        column.kind.as_str(),
                        kind.as_str()
                    );
                    column.kind = ValueKind::String;
                    column.conflicted = true;
                }
            }
        }
    }

    /// CSV bytes with the final header
    pub fn encode(&self) -> Result<Vec<u8>, StageError> {
        let mut writer = csv::Writer::from_writer(vec![]);

        let header: Vec<String> = self
            .reserved
            .iter()
            .map(|column| column.to_string())
            .chain(
                self.columns
                    .iter()
                    .map(|column| format!("{}:{}", column.name, column.kind.as_str())),
            )
            .collect();
        writer.write_record(&header)?;

        for (reserved, attributes) in &self.rows {
            let cells = reserved.iter().cloned().chain(self.columns.iter().map(|column| {
                attributes
                    .get(&column.name)
                    .map(Value::to_string)
                    .unwrap_or_default()
            }));
            writer.write_record(cells)?;
        }

        writer
            .into_inner()
            .map_err(|e| StageError::Io(std::io::Error::new(e.error().kind(), e.to_string())))
    }
}

/// Header of a staged batch, split into reserved and typed columns
struct Layout {
    reserved: Vec<usize>,
    attributes: Vec<(usize, String, ValueKind)>,
}

fn read_layout(
    batch: &str,
    headers: &csv::StringRecord,
    reserved: &[&str],
) -> Result<Layout, StageError> {
    let positions = reserved
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .ok_or_else(|| StageError::Malformed {
                    batch: batch.to_string(),
                    reason: format!("missing column {}", column),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let attributes = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !reserved.contains(h))
        .map(|(i, h)| match h.rsplit_once(':') {
            Some((name, kind)) => (
                i,
                name.to_string(),
                kind.parse().unwrap_or(ValueKind::String),
            ),
            None => (i, h.to_string(), ValueKind::String),
        })
        .collect();

    Ok(Layout {
        reserved: positions,
        attributes,
    })
}

fn read_rows(
    batch: &str,
    bytes: &[u8],
    reserved: &[&str],
    keep_nulls: bool,
) -> Result<Vec<(Vec<String>, BTreeMap<String, Value>)>, StageError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();
    let layout = read_layout(batch, &headers, reserved)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fixed = layout
            .reserved
            .iter()
            .map(|&i| record.get(i).unwrap_or_default().to_string())
            .collect();
        let attributes = layout
            .attributes
            .iter()
            .filter_map(|(i, name, kind)| {
                let value = Value::parse_as(record.get(*i).unwrap_or_default(), *kind);
                (keep_nulls || !value.is_null()).then(|| (name.clone(), value))
            })
            .collect();
        rows.push((fixed, attributes));
    }
    Ok(rows)
}

/// Node records of a staged node batch. Every attribute column of the
/// batch is present on every record, empty cells as `Null`.
pub fn decode_nodes(batch: &str, bytes: &[u8]) -> Result<Vec<NodeRecord>, StageError> {
    Ok(read_rows(batch, bytes, NODE_COLUMNS, true)?
        .into_iter()
        .map(|(fixed, attributes)| {
            let [key, label]: [String; 2] = fixed
                .try_into()
                .unwrap_or_else(|_| [String::new(), String::new()]);
            NodeRecord {
                label,
                key,
                attributes,
            }
        })
        .collect())
}

/// Relationship records of a staged relationship batch
pub fn decode_relations(batch: &str, bytes: &[u8]) -> Result<Vec<RelationRecord>, StageError> {
    let mut relations = Vec::new();
    for (fixed, attributes) in read_rows(batch, bytes, RELATION_COLUMNS, false)? {
        let mut fixed = fixed.into_iter();
        let mut next = || fixed.next().unwrap_or_default();
        relations.push(RelationRecord {
            start_label: next(),
            start_key: next(),
            end_label: next(),
            end_key: next(),
            rel_type: next(),
            reverse_type: next(),
            attributes,
        });
    }
    Ok(relations)
}
