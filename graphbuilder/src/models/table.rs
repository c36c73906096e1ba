// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Table and column metadata

use super::records::{NodeRecord, RelationRecord};
use super::tag::{tag_key, tag_node, DEFAULT_TAG_TYPE, TAG_NODE_LABEL};
use super::{non_empty, GraphSerializable, ModelError, NodeIter, OwnedScopes, RelationIter};
use std::iter::once_with;

pub const TABLE_NODE_LABEL: &str = "Table";
pub const TABLE_NAME: &str = "name";
pub const IS_VIEW: &str = "is_view";

pub const COLUMN_NODE_LABEL: &str = "Column";
pub const COLUMN_NAME: &str = "name";
pub const COLUMN_TYPE: &str = "type";
pub const COLUMN_ORDER: &str = "sort_order";

pub const DESCRIPTION_NODE_LABEL: &str = "Description";
pub const DESCRIPTION: &str = "description";

pub const SCHEMA_NODE_LABEL: &str = "Schema";
pub const CLUSTER_NODE_LABEL: &str = "Cluster";
pub const DATABASE_NODE_LABEL: &str = "Database";
pub const NAME: &str = "name";

pub const TABLE_RELATION_TYPE: &str = "TABLE";
pub const TABLE_OF_RELATION_TYPE: &str = "TABLE_OF";
pub const COLUMN_RELATION_TYPE: &str = "COLUMN";
pub const COLUMN_OF_RELATION_TYPE: &str = "COLUMN_OF";
pub const DESCRIPTION_RELATION_TYPE: &str = "DESCRIPTION";
pub const DESCRIPTION_OF_RELATION_TYPE: &str = "DESCRIPTION_OF";
pub const SCHEMA_RELATION_TYPE: &str = "SCHEMA";
pub const SCHEMA_OF_RELATION_TYPE: &str = "SCHEMA_OF";
pub const CLUSTER_RELATION_TYPE: &str = "CLUSTER";
pub const CLUSTER_OF_RELATION_TYPE: &str = "CLUSTER_OF";
pub const TAGGED_BY_RELATION_TYPE: &str = "TAGGED_BY";
pub const TAG_RELATION_TYPE: &str = "TAG";

/// One column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub description: Option<String>,
    pub col_type: String,
    pub sort_order: i64,
    pub tags: Vec<String>,
}

impl ColumnMetadata {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        col_type: impl Into<String>,
        sort_order: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: non_empty(description),
            col_type: col_type.into(),
            sort_order,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A table with its ordered columns
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub database: String,
    pub cluster: String,
    pub schema: String,
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<ColumnMetadata>,
    pub is_view: bool,
    pub tags: Vec<String>,
}

impl TableMetadata {
    /// Every part of the table key is required
    pub fn new(
        database: impl Into<String>,
        cluster: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let table = Self {
            database: database.into(),
            cluster: cluster.into(),
            schema: schema.into(),
            name: name.into(),
            description: None,
            columns: Vec::new(),
            is_view: false,
            tags: Vec::new(),
        };
        for (attribute, value) in [
            ("database", &table.database),
            ("cluster", &table.cluster),
            ("schema", &table.schema),
            ("name", &table.name),
        ] {
            if value.trim().is_empty() {
                return Err(ModelError::missing("TableMetadata", attribute));
            }
        }
        Ok(table)
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_empty(description);
        self
    }

    /// Columns ordered by their sort order; ties keep the given order
    pub fn with_columns(mut self, mut columns: Vec<ColumnMetadata>) -> Self {
        columns.sort_by_key(|column| column.sort_order);
        self.columns = columns;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn as_view(mut self, is_view: bool) -> Self {
        self.is_view = is_view;
        self
    }

    pub fn key(&self) -> String {
        format!(
            "{}://{}.{}/{}",
            self.database, self.cluster, self.schema, self.name
        )
    }

    pub fn schema_key(&self) -> String {
        format!("{}://{}.{}", self.database, self.cluster, self.schema)
    }

    pub fn cluster_key(&self) -> String {
        format!("{}://{}", self.database, self.cluster)
    }

    pub fn database_key(&self) -> String {
        format!("database://{}", self.database)
    }

    pub fn column_key(&self, column: &str) -> String {
        format!("{}/{}", self.key(), column)
    }

    pub fn description_key(owner_key: &str) -> String {
        format!("{}/_description", owner_key)
    }

    fn column_nodes<'a>(&'a self, column: &'a ColumnMetadata) -> NodeIter<'a> {
        let column_key = self.column_key(&column.name);
        let description_key = Self::description_key(&column_key);

        let node = NodeRecord::new(COLUMN_NODE_LABEL, column_key)
            .with_attribute(COLUMN_NAME, column.name.as_str())
            .with_attribute(COLUMN_TYPE, column.col_type.as_str())
            .with_attribute(COLUMN_ORDER, column.sort_order);

        let description = column.description.iter().map(move |text| {
            NodeRecord::new(DESCRIPTION_NODE_LABEL, description_key.clone())
                .with_attribute(DESCRIPTION, text.as_str())
        });
        let tags = column
            .tags
            .iter()
            .map(|tag| tag_node(tag, DEFAULT_TAG_TYPE));

        Box::new(std::iter::once(node).chain(description).chain(tags))
    }

    fn column_relations<'a>(&'a self, column: &'a ColumnMetadata) -> RelationIter<'a> {
        let table_key = self.key();
        let column_key = self.column_key(&column.name);

        let defining = RelationRecord::new(
            TABLE_NODE_LABEL,
            table_key,
            COLUMN_NODE_LABEL,
            column_key.clone(),
            COLUMN_RELATION_TYPE,
            COLUMN_OF_RELATION_TYPE,
        );

        let description_key = Self::description_key(&column_key);
        let description_column_key = column_key.clone();
        let description = column.description.iter().map(move |_| {
            RelationRecord::new(
                COLUMN_NODE_LABEL,
                description_column_key.clone(),
                DESCRIPTION_NODE_LABEL,
                description_key.clone(),
                DESCRIPTION_RELATION_TYPE,
                DESCRIPTION_OF_RELATION_TYPE,
            )
        });
        let tags = column.tags.iter().map(move |tag| {
            RelationRecord::new(
                COLUMN_NODE_LABEL,
                column_key.clone(),
                TAG_NODE_LABEL,
                tag_key(tag),
                TAGGED_BY_RELATION_TYPE,
                TAG_RELATION_TYPE,
            )
        });

        Box::new(std::iter::once(defining).chain(description).chain(tags))
    }
}

impl GraphSerializable for TableMetadata {
    fn nodes(&self) -> NodeIter<'_> {
        let table = once_with(move || {
            NodeRecord::new(TABLE_NODE_LABEL, self.key())
                .with_attribute(TABLE_NAME, self.name.as_str())
                .with_attribute(IS_VIEW, self.is_view)
        });
        let description = self.description.iter().map(move |text| {
            NodeRecord::new(DESCRIPTION_NODE_LABEL, Self::description_key(&self.key()))
                .with_attribute(DESCRIPTION, text.as_str())
        });
        let columns = self
            .columns
            .iter()
            .flat_map(move |column| self.column_nodes(column));
        let tags = self
            .tags
            .iter()
            .map(|tag| tag_node(tag, DEFAULT_TAG_TYPE));
        let hierarchy = once_with(move || {
            [
                NodeRecord::new(SCHEMA_NODE_LABEL, self.schema_key())
                    .with_attribute(NAME, self.schema.as_str()),
                NodeRecord::new(CLUSTER_NODE_LABEL, self.cluster_key())
                    .with_attribute(NAME, self.cluster.as_str()),
                NodeRecord::new(DATABASE_NODE_LABEL, self.database_key())
                    .with_attribute(NAME, self.database.as_str()),
            ]
        })
        .flatten();

        Box::new(
            table
                .chain(description)
                .chain(columns)
                .chain(tags)
                .chain(hierarchy),
        )
    }

    fn relations(&self) -> RelationIter<'_> {
        let defining = once_with(move || {
            RelationRecord::new(
                SCHEMA_NODE_LABEL,
                self.schema_key(),
                TABLE_NODE_LABEL,
                self.key(),
                TABLE_RELATION_TYPE,
                TABLE_OF_RELATION_TYPE,
            )
        });
        let description = self.description.iter().map(move |_| {
            RelationRecord::new(
                TABLE_NODE_LABEL,
                self.key(),
                DESCRIPTION_NODE_LABEL,
                Self::description_key(&self.key()),
                DESCRIPTION_RELATION_TYPE,
                DESCRIPTION_OF_RELATION_TYPE,
            )
        });
        let columns = self
            .columns
            .iter()
            .flat_map(move |column| self.column_relations(column));
        let tags = self.tags.iter().map(move |tag| {
            RelationRecord::new(
                TABLE_NODE_LABEL,
                self.key(),
                TAG_NODE_LABEL,
                tag_key(tag),
                TAGGED_BY_RELATION_TYPE,
                TAG_RELATION_TYPE,
            )
        });
        // Shared by every table of the schema; the run's dedup set keeps one
        let hierarchy = once_with(move || {
            [
                RelationRecord::new(
                    CLUSTER_NODE_LABEL,
                    self.cluster_key(),
                    SCHEMA_NODE_LABEL,
                    self.schema_key(),
                    SCHEMA_RELATION_TYPE,
                    SCHEMA_OF_RELATION_TYPE,
                ),
                RelationRecord::new(
                    DATABASE_NODE_LABEL,
                    self.database_key(),
                    CLUSTER_NODE_LABEL,
                    self.cluster_key(),
                    CLUSTER_RELATION_TYPE,
                    CLUSTER_OF_RELATION_TYPE,
                ),
            ]
        })
        .flatten();

        Box::new(
            defining
                .chain(description)
                .chain(columns)
                .chain(tags)
                .chain(hierarchy),
        )
    }

    /// Tables and columns belong to table runs alone. The hierarchy,
    /// descriptions and tags are shared with other kinds.
    fn owned_scopes() -> OwnedScopes {
        OwnedScopes::new()
            .label(TABLE_NODE_LABEL)
            .label(COLUMN_NODE_LABEL)
            .shared_label(DESCRIPTION_NODE_LABEL)
            .shared_label(TAG_NODE_LABEL)
            .shared_label(SCHEMA_NODE_LABEL)
            .shared_label(CLUSTER_NODE_LABEL)
            .shared_label(DATABASE_NODE_LABEL)
            .relation(SCHEMA_NODE_LABEL, TABLE_RELATION_TYPE, TABLE_NODE_LABEL)
            .relation(TABLE_NODE_LABEL, DESCRIPTION_RELATION_TYPE, DESCRIPTION_NODE_LABEL)
            .relation(TABLE_NODE_LABEL, COLUMN_RELATION_TYPE, COLUMN_NODE_LABEL)
            .relation(COLUMN_NODE_LABEL, DESCRIPTION_RELATION_TYPE, DESCRIPTION_NODE_LABEL)
            .relation(TABLE_NODE_LABEL, TAGGED_BY_RELATION_TYPE, TAG_NODE_LABEL)
            .relation(COLUMN_NODE_LABEL, TAGGED_BY_RELATION_TYPE, TAG_NODE_LABEL)
            .relation(CLUSTER_NODE_LABEL, SCHEMA_RELATION_TYPE, SCHEMA_NODE_LABEL)
            .relation(DATABASE_NODE_LABEL, CLUSTER_RELATION_TYPE, CLUSTER_NODE_LABEL)
    }
}
