// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Contiguous grouping of ordered records
//!
//! Records of one entity must arrive next to each other. Grouping never
//! sorts: the same key appearing in two separate runs yields two groups.

use super::ExtractError;
use crate::value::RawRecord;
use log::warn;
use std::iter::Peekable;

/// Values of the key fields of one record
pub type GroupKey = Vec<String>;

/// A maximal run of records sharing one key
#[derive(Debug, Clone, PartialEq)]
pub struct RecordGroup {
    pub key: GroupKey,
    pub records: Vec<RawRecord>,
}

/// Key of a record, `None` if any key field is null or absent
pub fn group_key(record: &RawRecord, fields: &[String]) -> Option<GroupKey> {
    fields.iter().map(|field| record.get_string(field)).collect()
}

/// Group `records` by the values of `fields`
pub fn group_contiguous<I>(records: I, fields: Vec<String>) -> GroupBy<I>
where
    I: Iterator<Item = Result<RawRecord, ExtractError>>,
{
    GroupBy {
        records: records.peekable(),
        fields,
        skipped: 0,
    }
}

/// Iterator over record groups, see [`group_contiguous`]
pub struct GroupBy<I>
where
    I: Iterator<Item = Result<RawRecord, ExtractError>>,
{
    records: Peekable<I>,
    fields: Vec<String>,
    skipped: usize,
}

impl<I> GroupBy<I>
where
    I: Iterator<Item = Result<RawRecord, ExtractError>>,
{
    /// Records dropped for lack of a complete key
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn continues(&mut self, key: &GroupKey) -> bool {
        match self.records.peek() {
            Some(Ok(next)) => group_key(next, &self.fields).as_ref() == Some(key),
            _ => false,
        }
    }
}

impl<I> Iterator for GroupBy<I>
where
    I: Iterator<Item = Result<RawRecord, ExtractError>>,
{
    type Item = Result<RecordGroup, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let first = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };

            let key = match group_key(&first, &self.fields) {
                Some(key) => key,
                None => {
                    self.skipped += 1;
                    warn!(
                        "Skipping record without a complete group key ({})",
                        self.fields.join(", ")
                    );
                    continue;
                }
            };

            let mut records = vec![first];
            while self.continues(&key) {
                if let Some(Ok(record)) = self.records.next() {
                    records.push(record);
                }
            }
            return Some(Ok(RecordGroup { key, records }));
        }
    }
}
