// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dashboards read back from the graph store
//!
//! Each published dashboard is flattened into one record with the fields
//! [`DashboardMetadata`](crate::models::DashboardMetadata) is built from,
//! which is the shape search indexing consumes.

use super::{ExtractError, Extractor};
use crate::config::Config;
use crate::models::dashboard::*;
use crate::storage::{GraphStore, StoredNode};
use crate::value::{RawRecord, Value};
use log::info;
use std::sync::Arc;

pub const SCOPE: &str = "extractor.dashboard_search_data";
/// Only dashboards published by this run are returned when set
pub const PUBLISHED_TAG_KEY: &str = "published_tag";

pub struct GraphDashboardExtractor {
    store: Arc<dyn GraphStore>,
    published_tag: Option<String>,
    dashboards: Option<std::vec::IntoIter<StoredNode>>,
}

impl GraphDashboardExtractor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            published_tag: None,
            dashboards: None,
        }
    }

    fn attribute_of(&self, label: &str, key: &str, attribute: &str) -> Result<Value, ExtractError> {
        Ok(self
            .store
            .get_node(label, key)?
            .and_then(|mut node| node.attributes.remove(attribute))
            .unwrap_or_default())
    }

    fn to_record(&self, dashboard: &StoredNode) -> Result<RawRecord, ExtractError> {
        let mut record = RawRecord::new();
        record.insert(
            FIELD_DASHBOARD_NAME,
            dashboard
                .attributes
                .get(DASHBOARD_NAME)
                .cloned()
                .unwrap_or_default(),
        );

        let mut column_names = Vec::new();
        for edge in self.store.relations_from(&dashboard.label, &dashboard.key)? {
            let (field, attribute) = match edge.rel_type.as_str() {
                DASHBOARD_OF_RELATION_TYPE => (FIELD_DASHBOARD_GROUP, DASHBOARD_NAME),
                DESCRIPTION_RELATION_TYPE => (FIELD_DESCRIPTION, DESCRIPTION),
                OWNER_RELATION_TYPE => (FIELD_SCHEMA_NAME, OWNER_ID),
                DATABASE_RELATION_TYPE => (FIELD_DATABASE, DATABASE),
                NAME_RELATION_TYPE => (FIELD_NAME, LAST_RELOAD),
                COLUMN_NAMES_RELATION_TYPE => {
                    column_names.push(edge.end_key);
                    continue;
                }
                _ => continue,
            };
            let value = self.attribute_of(&edge.end_label, &edge.end_key, attribute)?;
            record.insert(field, value);
        }

        if !column_names.is_empty() {
            record.insert(FIELD_COLUMN_NAMES, column_names);
        }
        Ok(record)
    }
}

impl Extractor for GraphDashboardExtractor {
    type Item = RawRecord;

    fn init(&mut self, config: &Config) -> Result<(), ExtractError> {
        self.published_tag = config
            .get_string(PUBLISHED_TAG_KEY)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string);

        let mut dashboards = self.store.nodes_by_label(DASHBOARD_NODE_LABEL)?;
        if let Some(tag) = &self.published_tag {
            dashboards.retain(|node| &node.published_tag == tag);
        }
        info!(
            "Found {} dashboard(s){}",
            dashboards.len(),
            self.published_tag
                .as_ref()
                .map(|tag| format!(" published as '{}'", tag))
                .unwrap_or_default()
        );
        self.dashboards = Some(dashboards.into_iter());
        Ok(())
    }

    fn extract(&mut self) -> Result<Option<RawRecord>, ExtractError> {
        let next = self
            .dashboards
            .as_mut()
            .ok_or(ExtractError::NotInitialized)?
            .next();
        match next {
            Some(dashboard) => self.to_record(&dashboard).map(Some),
            None => Ok(None),
        }
    }

    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn close(&mut self) -> Result<(), ExtractError> {
        self.dashboards = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DashboardMetadata, FromRecord, GraphSerializable, RunTag};
    use crate::storage::KvGraphStore;

    fn publish(store: &KvGraphStore, dashboard: &DashboardMetadata, tag: &RunTag) {
        let nodes: Vec<_> = dashboard.nodes().collect();
        let relations: Vec<_> = dashboard.relations().collect();
        store.merge_nodes(&nodes, tag).unwrap();
        store.merge_relations(&relations, tag).unwrap();
    }

    #[test]
    fn published_dashboards_read_back_as_records() {
        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let dashboard = DashboardMetadata::new("revenue", "finance")
            .unwrap()
            .with_database(Some("sales_db".to_string()))
            .with_schema_name(Some("s1".to_string()))
            .with_description(Some("monthly revenue".to_string()))
            .with_name(Some("2025-01-01".to_string()))
            .with_column_names(vec!["amount".to_string(), "region".to_string()]);
        publish(&store, &dashboard, &RunTag::new("run-1"));

        let mut extractor = GraphDashboardExtractor::new(store);
        extractor.init(&Config::new()).unwrap();
        let record = extractor.extract().unwrap().unwrap();
        assert!(extractor.extract().unwrap().is_none());

        assert_eq!(DashboardMetadata::from_record(&record).unwrap(), dashboard);
    }

    #[test]
    fn published_tag_filters_dashboards() {
        let store = Arc::new(KvGraphStore::in_memory().unwrap());
        let old = DashboardMetadata::new("old", "finance").unwrap();
        let new = DashboardMetadata::new("new", "finance").unwrap();
        publish(&store, &old, &RunTag::new("run-1"));
        publish(&store, &new, &RunTag::new("run-2"));

        let mut extractor = GraphDashboardExtractor::new(store);
        extractor
            .init(&Config::from_pairs([(PUBLISHED_TAG_KEY, "run-2")]))
            .unwrap();

        let record = extractor.extract().unwrap().unwrap();
        assert_eq!(record.get_string(FIELD_DASHBOARD_NAME).as_deref(), Some("new"));
        assert!(extractor.extract().unwrap().is_none());
    }
}
