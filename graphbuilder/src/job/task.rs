// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Extract, emit and stage

use super::RunContext;
use crate::config::Config;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::loader::{Loader, StageSummary};
use crate::models::{GraphEmitter, GraphSerializable};
use log::{info, warn};

/// Counters of one task run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSummary {
    pub entities: usize,
    pub skipped_entities: usize,
    /// Source records without a complete group key
    pub skipped_records: usize,
    pub suppressed_nodes: usize,
    pub suppressed_relations: usize,
    pub staged: StageSummary,
}

/// Pulls entities from an extractor and hands their records to a loader
pub struct DefaultTask<E, L> {
    extractor: E,
    loader: L,
    strict: bool,
}

impl<E, L> DefaultTask<E, L>
where
    E: Extractor,
    E::Item: GraphSerializable,
    L: Loader,
{
    pub fn new(extractor: E, loader: L) -> Self {
        Self {
            extractor,
            loader,
            strict: false,
        }
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Initialize both ends with their own configuration scope
    pub fn init(&mut self, config: &Config) -> Result<()> {
        self.extractor
            .init(&config.scoped(self.extractor.scope()))?;
        self.loader.init(&config.scoped(self.loader.scope()))?;
        Ok(())
    }

    pub fn run(&mut self, context: &mut RunContext) -> Result<TaskSummary> {
        let mut summary = TaskSummary::default();

        loop {
            match self.extractor.extract() {
                Ok(Some(entity)) => {
                    let mut emitter = GraphEmitter::new(&entity, context.dedup_mut());
                    self.loader.load(&mut emitter)?;
                    summary.entities += 1;
                    summary.suppressed_nodes += emitter.suppressed_nodes();
                    summary.suppressed_relations += emitter.suppressed_relations();
                }
                Ok(None) => break,
                Err(e) if e.is_entity_scoped() && !self.strict => {
                    warn!("{}", e);
                    summary.skipped_entities += 1;
                }
                Err(e) => {
                    if let Err(close_err) = self.extractor.close() {
                        warn!("Failed to close extractor: {}", close_err);
                    }
                    return Err(e.into());
                }
            }
        }

        summary.skipped_records = self.extractor.skipped_records();
        self.extractor.close()?;
        summary.staged = self.loader.close()?;

        info!(
            "Extracted {} entities ({} skipped, {} records without key), suppressed {} duplicate relationship(s)",
            summary.entities,
            summary.skipped_entities,
            summary.skipped_records,
            summary.suppressed_relations
        );
        Ok(summary)
    }
}
