// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dashboard metadata
//!
//! A dashboard belongs to a dashboard group and may carry a description,
//! the database it reads from, a last-reload name, an owning schema and a
//! list of column names. Each column name becomes a shared tag node.

use super::records::{NodeRecord, RelationRecord};
use super::tag::{tag_key, tag_node, TAG_NODE_LABEL};
use super::{
    non_empty, FromRecord, GraphSerializable, ModelError, NodeIter, OwnedScopes, RelationIter,
};
use crate::value::RawRecord;
use std::iter::once_with;

pub const DASHBOARD_NODE_LABEL: &str = "Dashboard";
pub const DASHBOARD_NAME: &str = "dashboard";

pub const DASHBOARD_GROUP_NODE_LABEL: &str = "Dashboardgroup";
pub const DASHBOARD_OF_RELATION_TYPE: &str = "DASHBOARD_OF";
pub const DASHBOARD_RELATION_TYPE: &str = "DASHBOARD";

pub const DESCRIPTION_NODE_LABEL: &str = "Description";
pub const DESCRIPTION: &str = "description";
pub const DESCRIPTION_RELATION_TYPE: &str = "DESCRIPTION";
pub const DESCRIPTION_OF_RELATION_TYPE: &str = "DESCRIPTION_OF";

pub const LAST_RELOAD_NODE_LABEL: &str = "Name";
pub const LAST_RELOAD: &str = "name";
pub const NAME_RELATION_TYPE: &str = "NAME";
pub const NAME_OF_RELATION_TYPE: &str = "NAME_OF";

pub const DATABASE_NODE_LABEL: &str = "Database";
pub const DATABASE: &str = "database";
pub const DATABASE_RELATION_TYPE: &str = "DATABASE";
pub const DATABASE_OF_RELATION_TYPE: &str = "DATABASE_OF";

pub const OWNER_NODE_LABEL: &str = "Schema";
pub const OWNER_ID: &str = "schema_name";
pub const OWNER_RELATION_TYPE: &str = "OWNER";
pub const OWNER_OF_RELATION_TYPE: &str = "OWNER_OF";

pub const COLUMN_NAMES_RELATION_TYPE: &str = "COLUMN_NAMES";
pub const COLUMN_NAMES_OF_RELATION_TYPE: &str = "COLUMN_NAMES_OF";
pub const DASHBOARD_TAG_TYPE: &str = "dashboard";

// Source record fields
pub const FIELD_DASHBOARD_NAME: &str = "dashboard_name";
pub const FIELD_DASHBOARD_GROUP: &str = "dashboard_group";
pub const FIELD_DATABASE: &str = "database";
pub const FIELD_SCHEMA_NAME: &str = "schema_name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_NAME: &str = "name";
pub const FIELD_COLUMN_NAMES: &str = "column_names";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetadata {
    pub dashboard_name: String,
    pub dashboard_group: String,
    pub database: Option<String>,
    pub schema_name: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub column_names: Vec<String>,
}

impl DashboardMetadata {
    pub fn new(
        dashboard_name: impl Into<String>,
        dashboard_group: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let dashboard_name = non_empty(Some(dashboard_name.into()))
            .ok_or_else(|| ModelError::missing("DashboardMetadata", FIELD_DASHBOARD_NAME))?;
        let dashboard_group = non_empty(Some(dashboard_group.into()))
            .ok_or_else(|| ModelError::missing("DashboardMetadata", FIELD_DASHBOARD_GROUP))?;

        Ok(Self {
            dashboard_name,
            dashboard_group,
            database: None,
            schema_name: None,
            description: None,
            name: None,
            column_names: Vec::new(),
        })
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = non_empty(database);
        self
    }

    pub fn with_schema_name(mut self, schema_name: Option<String>) -> Self {
        self.schema_name = non_empty(schema_name);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_empty(description);
        self
    }

    /// Last reload marker
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = non_empty(name);
        self
    }

    pub fn with_column_names(mut self, column_names: Vec<String>) -> Self {
        self.column_names = column_names
            .into_iter()
            .filter_map(|c| non_empty(Some(c)))
            .collect();
        self
    }

    pub fn key(&self) -> String {
        format!("{}://{}", self.dashboard_group, self.dashboard_name)
    }

    pub fn group_key(&self) -> String {
        format!("dashboardgroup://{}", self.dashboard_group)
    }

    pub fn description_key(&self) -> String {
        format!("{}/_description", self.key())
    }

    pub fn last_reload_key(&self) -> String {
        format!("{}/_name", self.key())
    }

    pub fn database_key(database: &str) -> String {
        format!("database://{}", database)
    }

    /// Owners are shared by every dashboard of the schema
    pub fn owner_key(schema_name: &str) -> String {
        schema_name.to_string()
    }

    fn relation_to(
        &self,
        end_label: &str,
        end_key: String,
        rel_type: &str,
        reverse_type: &str,
    ) -> RelationRecord {
        RelationRecord::new(
            DASHBOARD_NODE_LABEL,
            self.key(),
            end_label,
            end_key,
            rel_type,
            reverse_type,
        )
    }
}

impl FromRecord for DashboardMetadata {
    fn from_record(record: &RawRecord) -> Result<Self, ModelError> {
        let name = record
            .get_string(FIELD_DASHBOARD_NAME)
            .ok_or_else(|| ModelError::missing("DashboardMetadata", FIELD_DASHBOARD_NAME))?;
        let group = record
            .get_string(FIELD_DASHBOARD_GROUP)
            .ok_or_else(|| ModelError::missing("DashboardMetadata", FIELD_DASHBOARD_GROUP))?;

        Ok(Self::new(name, group)?
            .with_database(record.get_string(FIELD_DATABASE))
            .with_schema_name(record.get_string(FIELD_SCHEMA_NAME))
            .with_description(record.get_string(FIELD_DESCRIPTION))
            .with_name(record.get_string(FIELD_NAME))
            .with_column_names(record.get_string_list(FIELD_COLUMN_NAMES)))
    }
}

impl GraphSerializable for DashboardMetadata {
    fn nodes(&self) -> NodeIter<'_> {
        let dashboard = once_with(move || {
            NodeRecord::new(DASHBOARD_NODE_LABEL, self.key())
                .with_attribute(DASHBOARD_NAME, self.dashboard_name.as_str())
        });
        let group = once_with(move || {
            NodeRecord::new(DASHBOARD_GROUP_NODE_LABEL, self.group_key())
                .with_attribute(DASHBOARD_NAME, self.dashboard_group.as_str())
        });
        let database = self.database.iter().map(|database| {
            NodeRecord::new(DATABASE_NODE_LABEL, Self::database_key(database))
                .with_attribute(DATABASE, database.as_str())
        });
        let description = self.description.iter().map(move |text| {
            NodeRecord::new(DESCRIPTION_NODE_LABEL, self.description_key())
                .with_attribute(DESCRIPTION, text.as_str())
        });
        let last_reload = self.name.iter().map(move |name| {
            NodeRecord::new(LAST_RELOAD_NODE_LABEL, self.last_reload_key())
                .with_attribute(LAST_RELOAD, name.as_str())
        });
        let owner = self.schema_name.iter().map(|schema| {
            NodeRecord::new(OWNER_NODE_LABEL, Self::owner_key(schema))
                .with_attribute(OWNER_ID, schema.as_str())
        });
        let tags = self
            .column_names
            .iter()
            .map(|column| tag_node(column, DASHBOARD_TAG_TYPE));

        Box::new(
            dashboard
                .chain(group)
                .chain(database)
                .chain(description)
                .chain(last_reload)
                .chain(owner)
                .chain(tags),
        )
    }

    fn relations(&self) -> RelationIter<'_> {
        let group = once_with(move || {
            self.relation_to(
                DASHBOARD_GROUP_NODE_LABEL,
                self.group_key(),
                DASHBOARD_OF_RELATION_TYPE,
                DASHBOARD_RELATION_TYPE,
            )
        });
        let description = self.description.iter().map(move |_| {
            self.relation_to(
                DESCRIPTION_NODE_LABEL,
                self.description_key(),
                DESCRIPTION_RELATION_TYPE,
                DESCRIPTION_OF_RELATION_TYPE,
            )
        });
        let database = self.database.iter().map(move |database| {
            self.relation_to(
                DATABASE_NODE_LABEL,
                Self::database_key(database),
                DATABASE_RELATION_TYPE,
                DATABASE_OF_RELATION_TYPE,
            )
        });
        let last_reload = self.name.iter().map(move |_| {
            self.relation_to(
                LAST_RELOAD_NODE_LABEL,
                self.last_reload_key(),
                NAME_RELATION_TYPE,
                NAME_OF_RELATION_TYPE,
            )
        });
        let owner = self.schema_name.iter().map(move |schema| {
            self.relation_to(
                OWNER_NODE_LABEL,
                Self::owner_key(schema),
                OWNER_RELATION_TYPE,
                OWNER_OF_RELATION_TYPE,
            )
        });
        let tags = self.column_names.iter().map(move |column| {
            self.relation_to(
                TAG_NODE_LABEL,
                tag_key(column),
                COLUMN_NAMES_RELATION_TYPE,
                COLUMN_NAMES_OF_RELATION_TYPE,
            )
        });

        Box::new(
            group
                .chain(description)
                .chain(database)
                .chain(last_reload)
                .chain(owner)
                .chain(tags),
        )
    }

    fn owned_scopes() -> OwnedScopes {
        OwnedScopes::new()
            .label(DASHBOARD_NODE_LABEL)
            .label(LAST_RELOAD_NODE_LABEL)
            .shared_label(DASHBOARD_GROUP_NODE_LABEL)
            .shared_label(DESCRIPTION_NODE_LABEL)
            .shared_label(DATABASE_NODE_LABEL)
            .shared_label(OWNER_NODE_LABEL)
            .shared_label(TAG_NODE_LABEL)
            .relation(DASHBOARD_NODE_LABEL, DASHBOARD_OF_RELATION_TYPE, DASHBOARD_GROUP_NODE_LABEL)
            .relation(DASHBOARD_NODE_LABEL, DESCRIPTION_RELATION_TYPE, DESCRIPTION_NODE_LABEL)
            .relation(DASHBOARD_NODE_LABEL, DATABASE_RELATION_TYPE, DATABASE_NODE_LABEL)
            .relation(DASHBOARD_NODE_LABEL, NAME_RELATION_TYPE, LAST_RELOAD_NODE_LABEL)
            .relation(DASHBOARD_NODE_LABEL, OWNER_RELATION_TYPE, OWNER_NODE_LABEL)
            .relation(DASHBOARD_NODE_LABEL, COLUMN_NAMES_RELATION_TYPE, TAG_NODE_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn full() -> DashboardMetadata {
        DashboardMetadata::new("revenue", "finance")
            .unwrap()
            .with_database(Some("sales_db".to_string()))
            .with_schema_name(Some("s1".to_string()))
            .with_description(Some("monthly revenue".to_string()))
            .with_name(Some("2025-01-01".to_string()))
            .with_column_names(vec!["amount".to_string(), "region".to_string()])
    }

    #[test]
    fn keys() {
        let dashboard = full();
        assert_eq!(dashboard.key(), "finance://revenue");
        assert_eq!(dashboard.group_key(), "dashboardgroup://finance");
        assert_eq!(dashboard.description_key(), "finance://revenue/_description");
        assert_eq!(dashboard.last_reload_key(), "finance://revenue/_name");
        assert_eq!(DashboardMetadata::database_key("sales_db"), "database://sales_db");
    }

    #[test]
    fn declared_scopes_cover_everything_emitted() {
        let owned = DashboardMetadata::owned_scopes();
        let dashboard = full();

        for node in dashboard.nodes() {
            assert!(
                owned.labels.contains(&node.label) || owned.shared_labels.contains(&node.label),
                "{} is not declared",
                node.label
            );
        }
        for rel in dashboard.relations() {
            assert!(owned
                .relations
                .iter()
                .any(|scope| scope.matches(&rel.start_label, &rel.rel_type, &rel.end_label)));
        }
        // Owners are the same Schema label table runs write
        assert!(!owned.labels.contains(&OWNER_NODE_LABEL.to_string()));
    }

    #[test]
    fn minimal_dashboard_emits_no_dangling_relationships() {
        let dashboard = DashboardMetadata::new("revenue", "finance").unwrap();

        let labels: Vec<_> = dashboard.nodes().map(|n| n.label).collect();
        assert_eq!(labels, vec![DASHBOARD_NODE_LABEL, DASHBOARD_GROUP_NODE_LABEL]);

        let relations: Vec<_> = dashboard.relations().collect();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].rel_type, DASHBOARD_OF_RELATION_TYPE);
        assert_eq!(relations[0].reverse_type, DASHBOARD_RELATION_TYPE);
    }

    #[test]
    fn every_relationship_endpoint_is_an_emitted_node() {
        let dashboard = full();
        let nodes: Vec<_> = dashboard.nodes().map(|n| (n.label, n.key)).collect();

        for rel in dashboard.relations() {
            assert!(nodes.contains(&(rel.start_label.clone(), rel.start_key.clone())));
            assert!(nodes.contains(&(rel.end_label.clone(), rel.end_key.clone())));
        }
    }

    #[test]
    fn column_names_are_shared_tag_nodes() {
        let tags: Vec<_> = full()
            .nodes()
            .filter(|n| n.label == TAG_NODE_LABEL)
            .collect();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key, "amount");
        assert_eq!(
            tags[0].attributes.get("tag_type"),
            Some(&Value::from(DASHBOARD_TAG_TYPE))
        );
    }

    #[test]
    fn from_record_requires_name_and_group() {
        let record = RawRecord::new()
            .with(FIELD_DASHBOARD_NAME, "revenue")
            .with(FIELD_SCHEMA_NAME, "s1");

        let err = DashboardMetadata::from_record(&record).unwrap_err();
        assert_eq!(
            err,
            ModelError::missing("DashboardMetadata", FIELD_DASHBOARD_GROUP)
        );
    }

    #[test]
    fn from_record_reads_optional_fields() {
        let record = RawRecord::new()
            .with(FIELD_DASHBOARD_NAME, "revenue")
            .with(FIELD_DASHBOARD_GROUP, "finance")
            .with(FIELD_DESCRIPTION, "")
            .with(FIELD_COLUMN_NAMES, vec!["amount".to_string()]);

        let dashboard = DashboardMetadata::from_record(&record).unwrap();
        assert_eq!(dashboard.description, None);
        assert_eq!(dashboard.column_names, vec!["amount"]);
    }
}
