// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! One entity per source record

use super::{ExtractError, Extractor, QueryConnection, RecordIter};
use crate::config::Config;
use crate::models::FromRecord;
use std::marker::PhantomData;

pub const SCOPE: &str = "extractor.generic";
pub const QUERY_KEY: &str = "query";

/// Builds a `T` from every record a connection returns
pub struct GenericExtractor<T> {
    connection: Box<dyn QueryConnection>,
    records: Option<RecordIter>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> GenericExtractor<T> {
    pub fn new(connection: Box<dyn QueryConnection>) -> Self {
        Self {
            connection,
            records: None,
            _entity: PhantomData,
        }
    }
}

impl<T: FromRecord> Extractor for GenericExtractor<T> {
    type Item = T;

    fn init(&mut self, config: &Config) -> Result<(), ExtractError> {
        let query = config.get_string_or(QUERY_KEY, "");
        self.records = Some(self.connection.issue(&query)?);
        Ok(())
    }

    fn extract(&mut self) -> Result<Option<T>, ExtractError> {
        let records = self.records.as_mut().ok_or(ExtractError::NotInitialized)?;
        match records.next() {
            Some(record) => Ok(Some(T::from_record(&record?)?)),
            None => Ok(None),
        }
    }

    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn close(&mut self) -> Result<(), ExtractError> {
        self.records = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::InMemoryConnection;
    use crate::models::DashboardMetadata;
    use crate::value::RawRecord;

    #[test]
    fn bad_record_skips_one_entity() {
        let rows = vec![
            RawRecord::new()
                .with("dashboard_name", "d1")
                .with("dashboard_group", "g"),
            RawRecord::new().with("dashboard_name", "d2"),
            RawRecord::new()
                .with("dashboard_name", "d3")
                .with("dashboard_group", "g"),
        ];
        let mut extractor: GenericExtractor<DashboardMetadata> =
            GenericExtractor::new(Box::new(InMemoryConnection::new(rows)));
        extractor.init(&Config::new()).unwrap();

        assert_eq!(extractor.extract().unwrap().unwrap().dashboard_name, "d1");
        assert!(extractor.extract().unwrap_err().is_entity_scoped());
        assert_eq!(extractor.extract().unwrap().unwrap().dashboard_name, "d3");
        assert!(extractor.extract().unwrap().is_none());
    }
}
