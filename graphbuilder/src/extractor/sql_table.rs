// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Table metadata from relational catalogs
//!
//! One extractor serves every catalog. A [`SqlDialect`] supplies the query
//! template and tells which result columns carry which logical field; the
//! rows are grouped by `(schema, table)` and folded into [`TableMetadata`].

use super::grouping::{group_contiguous, GroupBy, RecordGroup};
use super::{ExtractError, Extractor, QueryConnection, RecordIter};
use crate::config::{Config, ConfigError};
use crate::models::{ColumnMetadata, ModelError, TableMetadata};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const SCOPE: &str = "extractor.sql_table";

// Options
pub const DIALECT_KEY: &str = "dialect";
pub const WHERE_CLAUSE_SUFFIX_KEY: &str = "where_clause_suffix";
pub const CLUSTER_KEY: &str = "cluster";
pub const DATABASE_KEY: &str = "database";

const DEFAULT_DIALECT: &str = "hive";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Result columns holding each logical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// `None` when the query does not return a cluster; the configured one
    /// is used instead
    pub cluster: Option<&'static str>,
    pub schema: &'static str,
    pub table: &'static str,
    pub table_description: Option<&'static str>,
    pub is_view: Option<&'static str>,
    pub column_name: &'static str,
    pub column_type: &'static str,
    pub column_description: &'static str,
    /// Preferred over `column_description` when non-null
    pub column_extras: Option<&'static str>,
    pub column_sort_order: &'static str,
}

/// Query template and column mapping of one catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDialect {
    pub name: &'static str,
    pub database: &'static str,
    pub default_cluster: &'static str,
    /// SQL with `{where_clause_suffix}` and `{cluster_source}` placeholders
    pub template: &'static str,
    pub columns: ColumnMapping,
}

const ATHENA_SQL: &str = "\
SELECT '{cluster_source}' AS cluster, table_schema AS schema_name, table_name AS name, \
column_name AS col_name, data_type AS col_type, ordinal_position AS col_sort_order, \
comment AS col_description, extra_info AS extras \
FROM information_schema.columns \
{where_clause_suffix} \
ORDER BY cluster, schema_name, name, col_sort_order";

const ORACLE_SQL: &str = "\
SELECT at.OWNER AS schema_name, utb.TABLE_NAME AS table_name, utb.COMMENTS AS table_desc, \
ucc.COLUMN_NAME AS col_name, ucc.COMMENTS AS col_description, utc.DATA_TYPE AS col_type, \
utc.COLUMN_ID AS col_sort_order \
FROM user_tab_comments utb \
LEFT JOIN user_col_comments ucc ON utb.TABLE_NAME = ucc.TABLE_NAME \
LEFT JOIN user_tab_columns utc ON utc.TABLE_NAME = utb.TABLE_NAME AND utc.COLUMN_NAME = ucc.COLUMN_NAME \
LEFT JOIN ALL_TABLES at ON at.TABLE_NAME = utb.TABLE_NAME \
{where_clause_suffix} \
ORDER BY schema_name, table_name, col_sort_order";

const HIVE_SQL: &str = "\
SELECT '{cluster_source}' AS cluster, c.table_schema AS schema_name, c.table_name AS name, \
t.table_comment AS description, CASE WHEN t.table_type = 'VIEW' THEN 1 ELSE 0 END AS is_view, \
c.column_name AS col_name, c.data_type AS col_type, c.column_comment AS col_description, \
c.ordinal_position AS col_sort_order \
FROM information_schema.columns c \
JOIN information_schema.tables t ON c.table_schema = t.table_schema AND c.table_name = t.table_name \
{where_clause_suffix} \
ORDER BY cluster, schema_name, name, col_sort_order";

impl SqlDialect {
    pub fn athena() -> Self {
        Self {
            name: "athena",
            database: "athena",
            default_cluster: "master",
            template: ATHENA_SQL,
            columns: ColumnMapping {
                cluster: Some("cluster"),
                schema: "schema_name",
                table: "name",
                table_description: None,
                is_view: None,
                column_name: "col_name",
                column_type: "col_type",
                column_description: "col_description",
                column_extras: Some("extras"),
                column_sort_order: "col_sort_order",
            },
        }
    }

    pub fn oracle() -> Self {
        Self {
            name: "oracle",
            database: "oracle",
            default_cluster: "gold",
            template: ORACLE_SQL,
            columns: ColumnMapping {
                cluster: None,
                schema: "schema_name",
                table: "table_name",
                table_description: Some("table_desc"),
                is_view: None,
                column_name: "col_name",
                column_type: "col_type",
                column_description: "col_description",
                column_extras: None,
                column_sort_order: "col_sort_order",
            },
        }
    }

    pub fn hive() -> Self {
        Self {
            name: "hive",
            database: "hive",
            default_cluster: "gold",
            template: HIVE_SQL,
            columns: ColumnMapping {
                cluster: Some("cluster"),
                schema: "schema_name",
                table: "name",
                table_description: Some("description"),
                is_view: Some("is_view"),
                column_name: "col_name",
                column_type: "col_type",
                column_description: "col_description",
                column_extras: None,
                column_sort_order: "col_sort_order",
            },
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "athena" => Some(Self::athena()),
            "oracle" => Some(Self::oracle()),
            "hive" => Some(Self::hive()),
            _ => None,
        }
    }

    /// Fill the template placeholders. Unknown placeholders are left as is.
    pub fn render(&self, where_clause_suffix: &str, cluster: &str) -> String {
        PLACEHOLDER
            .replace_all(self.template, |caps: &Captures| match &caps[1] {
                "where_clause_suffix" => where_clause_suffix.to_string(),
                "cluster_source" => cluster.to_string(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Defaults applied under the extractor scope
pub fn default_config() -> Config {
    Config::from_pairs([
        (DIALECT_KEY, DEFAULT_DIALECT),
        (WHERE_CLAUSE_SUFFIX_KEY, " "),
    ])
}

/// Extracts [`TableMetadata`] from a catalog query
pub struct SqlTableMetadataExtractor {
    connection: Box<dyn QueryConnection>,
    dialect: Option<SqlDialect>,
    cluster: String,
    database: String,
    sql: String,
    groups: Option<GroupBy<RecordIter>>,
}

impl SqlTableMetadataExtractor {
    pub fn new(connection: Box<dyn QueryConnection>) -> Self {
        Self {
            connection,
            dialect: None,
            cluster: String::new(),
            database: String::new(),
            sql: String::new(),
            groups: None,
        }
    }

    /// Rendered query, empty before `init`
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Build one table from its rows.
    ///
    /// Columns come from every row in arrival order. Table-level fields are
    /// taken from the last row of the group.
    fn build_table(
        &self,
        dialect: &SqlDialect,
        group: RecordGroup,
    ) -> Result<TableMetadata, ModelError> {
        let mapping = &dialect.columns;
        let last = group
            .records
            .last()
            .ok_or_else(|| ModelError::missing("TableMetadata", mapping.table))?;

        let cluster = mapping
            .cluster
            .and_then(|field| last.get_string(field))
            .unwrap_or_else(|| self.cluster.clone());
        let schema = last.get_string(mapping.schema).unwrap_or_default();
        let name = last.get_string(mapping.table).unwrap_or_default();
        let description = mapping
            .table_description
            .and_then(|field| last.get_string(field));
        let is_view = mapping
            .is_view
            .and_then(|field| last.get(field))
            .map(|value| matches!(value.to_string().as_str(), "1" | "true"))
            .unwrap_or(false);

        let columns = group
            .records
            .iter()
            .enumerate()
            .filter_map(|(position, row)| {
                let column = row.get_string(mapping.column_name)?;
                let description = mapping
                    .column_extras
                    .and_then(|field| row.get_string(field))
                    .or_else(|| row.get_string(mapping.column_description));
                let sort_order = row
                    .get_i64(mapping.column_sort_order)
                    .unwrap_or(position as i64);
                Some(ColumnMetadata::new(
                    column,
                    description,
                    row.get_string(mapping.column_type).unwrap_or_default(),
                    sort_order,
                ))
            })
            .collect();

        Ok(TableMetadata::new(self.database.as_str(), cluster, schema, name)?
            .with_description(description)
            .with_columns(columns)
            .as_view(is_view))
    }
}

impl Extractor for SqlTableMetadataExtractor {
    type Item = TableMetadata;

    fn init(&mut self, config: &Config) -> Result<(), ExtractError> {
        let config = config.with_fallback(&default_config());
        let dialect_name = config.get_required(DIALECT_KEY)?;
        let dialect = SqlDialect::from_name(dialect_name).ok_or_else(|| {
            ConfigError::Invalid {
                key: DIALECT_KEY.to_string(),
                value: dialect_name.to_string(),
                expected: "one of athena, oracle, hive".to_string(),
            }
        })?;

        self.cluster = config.get_string_or(CLUSTER_KEY, dialect.default_cluster);
        self.database = config.get_string_or(DATABASE_KEY, dialect.database);
        let where_clause_suffix = config.get_string_or(WHERE_CLAUSE_SUFFIX_KEY, " ");
        self.sql = dialect.render(&where_clause_suffix, &self.cluster);
        info!("SQL for {} metadata: {}", dialect.name, self.sql);

        let rows = self.connection.issue(&self.sql)?;
        let key_fields = vec![
            dialect.columns.schema.to_string(),
            dialect.columns.table.to_string(),
        ];
        self.groups = Some(group_contiguous(rows, key_fields));
        self.dialect = Some(dialect);
        Ok(())
    }

    fn extract(&mut self) -> Result<Option<TableMetadata>, ExtractError> {
        let group = match self.groups.as_mut() {
            Some(groups) => groups.next(),
            None => return Err(ExtractError::NotInitialized),
        };
        let group = match group {
            Some(group) => group?,
            None => return Ok(None),
        };
        let dialect = self.dialect.as_ref().ok_or(ExtractError::NotInitialized)?;

        debug!(
            "Building table {} from {} rows",
            group.key.join("."),
            group.records.len()
        );
        let table = self.build_table(dialect, group)?;
        Ok(Some(table))
    }

    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn skipped_records(&self) -> usize {
        self.groups.as_ref().map(GroupBy::skipped).unwrap_or(0)
    }

    fn close(&mut self) -> Result<(), ExtractError> {
        self.groups = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::InMemoryConnection;
    use crate::value::{RawRecord, Value};

    fn hive_row(schema: &str, table: &str, col: &str, order: i64) -> RawRecord {
        RawRecord::new()
            .with("cluster", "gold")
            .with("schema_name", schema)
            .with("name", table)
            .with("col_name", col)
            .with("col_type", "string")
            .with("col_sort_order", order)
    }

    fn extractor(rows: Vec<RawRecord>, config: &Config) -> SqlTableMetadataExtractor {
        let mut extractor =
            SqlTableMetadataExtractor::new(Box::new(InMemoryConnection::new(rows)));
        extractor.init(config).unwrap();
        extractor
    }

    fn drain(extractor: &mut SqlTableMetadataExtractor) -> Vec<TableMetadata> {
        std::iter::from_fn(|| extractor.extract().unwrap()).collect()
    }

    #[test]
    fn contiguous_rows_group_into_tables() {
        let mut extractor = extractor(
            vec![
                hive_row("s1", "t1", "a", 1),
                hive_row("s1", "t1", "b", 2),
                hive_row("s1", "t2", "c", 1),
            ],
            &Config::new(),
        );
        let tables = drain(&mut extractor);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "t1");
        let columns: Vec<_> = tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["a", "b"]);
        assert_eq!(tables[1].name, "t2");
        assert_eq!(tables[1].columns.len(), 1);
        assert_eq!(tables[1].columns[0].name, "c");
    }

    #[test]
    fn sort_order_wins_over_arrival_order() {
        let mut extractor = extractor(
            vec![
                hive_row("s1", "t1", "b", 2),
                hive_row("s1", "t1", "a", 1),
                hive_row("s1", "t1", "c", 2),
            ],
            &Config::new(),
        );
        let table = drain(&mut extractor).remove(0);

        let columns: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn last_row_sets_table_level_fields() {
        let mut extractor = extractor(
            vec![
                hive_row("s1", "t1", "a", 1).with("description", "first"),
                hive_row("s1", "t1", "b", 2).with("description", "last"),
            ],
            &Config::new(),
        );
        let table = drain(&mut extractor).remove(0);
        assert_eq!(table.description.as_deref(), Some("last"));
    }

    #[test]
    fn athena_prefers_extras_and_renders_cluster() {
        let config = Config::from_pairs([
            (DIALECT_KEY, "athena"),
            (CLUSTER_KEY, "prod"),
            (WHERE_CLAUSE_SUFFIX_KEY, "WHERE table_schema = 'sales'"),
        ]);
        let row = hive_row("sales", "orders", "id", 1)
            .with("cluster", "prod")
            .with("col_description", "comment")
            .with("extras", "partition key");
        let mut extractor = extractor(vec![row], &config);

        assert!(extractor.sql().contains("'prod' AS cluster"));
        assert!(extractor.sql().contains("WHERE table_schema = 'sales'"));
        assert!(!extractor.sql().contains('{'));

        let table = drain(&mut extractor).remove(0);
        assert_eq!(table.key(), "athena://prod.sales/orders");
        assert_eq!(
            table.columns[0].description.as_deref(),
            Some("partition key")
        );
    }

    #[test]
    fn oracle_takes_cluster_from_configuration() {
        let row = RawRecord::new()
            .with("schema_name", "HR")
            .with("table_name", "EMPLOYEES")
            .with("table_desc", "staff")
            .with("col_name", "ID")
            .with("col_type", "NUMBER")
            .with("col_sort_order", 1i64);
        let mut extractor = extractor(vec![row], &Config::from_pairs([(DIALECT_KEY, "oracle")]));

        let table = drain(&mut extractor).remove(0);
        assert_eq!(table.key(), "oracle://gold.HR/EMPLOYEES");
        assert_eq!(table.description.as_deref(), Some("staff"));
    }

    #[test]
    fn rows_without_a_column_yield_an_empty_table() {
        let row = hive_row("s1", "t1", "a", 1).with("col_name", Value::Null);
        let mut extractor = extractor(vec![row], &Config::new());

        let table = drain(&mut extractor).remove(0);
        assert!(table.columns.is_empty());
    }

    #[test]
    fn unknown_dialect_fails_at_init() {
        let mut extractor =
            SqlTableMetadataExtractor::new(Box::new(InMemoryConnection::default()));
        let err = extractor
            .init(&Config::from_pairs([(DIALECT_KEY, "db2")]))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    #[test]
    fn extract_before_init_is_an_error() {
        let mut extractor =
            SqlTableMetadataExtractor::new(Box::new(InMemoryConnection::default()));
        assert!(matches!(
            extractor.extract(),
            Err(ExtractError::NotInitialized)
        ));
    }
}
