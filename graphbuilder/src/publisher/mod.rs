// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Publishing staged batches into the graph store
//!
//! Publishing runs in two phases separated by a barrier:
//!
//! 1. **Upsert**: every staged node batch is merged, then every staged
//!    relationship batch. Each write stamps the run's tag. Transient store
//!    errors are retried with backoff; anything else aborts the run.
//! 2. **Prune**: only when every upsert committed and the run was not
//!    cancelled, each owned scope is cleared of entities carrying another
//!    tag. A failing scope is reported and the remaining scopes proceed.
//!
//! Owned scopes are declared by the entity kind being published (see
//! [`GraphSerializable::owned_scopes`](crate::models::GraphSerializable::owned_scopes)),
//! never derived from what happened to be staged: a run that staged no
//! descriptions still owns the descriptions it wrote last time.

pub mod retry;

use crate::config::{Config, ConfigError};
use crate::loader::{decode_nodes, decode_relations, StageError};
use crate::models::{OwnedScopes, RelationScope, RunTag};
use crate::staging::{StagingStore, NODES_DIR, RELATIONSHIPS_DIR};
use crate::storage::{GraphStore, PruneScope, StorageError};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use retry::RetryPolicy;
pub use tokio_util::sync::CancellationToken;

pub const SCOPE: &str = "publisher.graph";

// Options
pub const JOB_PUBLISH_TAG: &str = "job_publish_tag";
pub const MAX_RETRIES: &str = "max_retries";
pub const RETRY_BASE_MS: &str = "retry_base_ms";
pub const RETRY_MAX_MS: &str = "retry_max_ms";
pub const PARALLEL_UPSERT: &str = "parallel_upsert";
pub const PRUNE: &str = "prune";
pub const OWNED_LABELS: &str = "owned_labels";
pub const SHARED_LABELS: &str = "shared_labels";
pub const OWNED_RELATIONS: &str = "owned_relations";
pub const MAX_PRUNE_PCT: &str = "max_prune_pct";
pub const DELETE_STAGING_ON_SUCCESS: &str = "delete_staging_on_success";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read staged batches: {0}")]
    Staging(#[from] StageError),

    #[error("Upsert of {batch} failed: {source}")]
    Upsert {
        batch: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to commit graph store: {0}")]
    Flush(#[source] StorageError),

    #[error("Publish cancelled")]
    Cancelled,

    #[error("Publisher used before init")]
    NotInitialized,
}

/// Publisher options, read from the `publisher.graph` scope
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    pub tag: RunTag,
    pub retry: RetryPolicy,
    pub parallel_upsert: bool,
    pub prune: bool,
    /// Replaces the declared exclusive labels when set
    pub owned_labels: Option<Vec<String>>,
    /// Replaces the declared shared labels when set
    pub shared_labels: Option<Vec<String>>,
    /// Replaces the declared relationship triples when set
    pub owned_relations: Option<Vec<RelationScope>>,
    /// Largest share of a scope, in percent, that pruning may remove
    pub max_prune_pct: u64,
    pub delete_staging_on_success: bool,
}

impl PublisherConfig {
    pub fn new(tag: RunTag) -> Self {
        Self {
            tag,
            retry: RetryPolicy::default(),
            parallel_upsert: true,
            prune: true,
            owned_labels: None,
            shared_labels: None,
            owned_relations: None,
            max_prune_pct: 100,
            delete_staging_on_success: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let tag = RunTag::new(config.get_required(JOB_PUBLISH_TAG)?.trim());
        let defaults = Self::new(tag.clone());

        let max_prune_pct = config.get_u64_or(MAX_PRUNE_PCT, defaults.max_prune_pct)?;
        if max_prune_pct > 100 {
            return Err(ConfigError::Invalid {
                key: MAX_PRUNE_PCT.to_string(),
                value: max_prune_pct.to_string(),
                expected: "a percentage between 0 and 100".to_string(),
            });
        }

        Ok(Self {
            tag,
            retry: RetryPolicy {
                max_retries: config
                    .get_u64_or(MAX_RETRIES, defaults.retry.max_retries as u64)?
                    as u32,
                base: Duration::from_millis(
                    config.get_u64_or(RETRY_BASE_MS, defaults.retry.base.as_millis() as u64)?,
                ),
                max: Duration::from_millis(
                    config.get_u64_or(RETRY_MAX_MS, defaults.retry.max.as_millis() as u64)?,
                ),
            },
            parallel_upsert: config.get_bool_or(PARALLEL_UPSERT, defaults.parallel_upsert)?,
            prune: config.get_bool_or(PRUNE, defaults.prune)?,
            owned_labels: config.get_list(OWNED_LABELS),
            shared_labels: config.get_list(SHARED_LABELS),
            owned_relations: config
                .get_list(OWNED_RELATIONS)
                .map(|triples| {
                    triples
                        .iter()
                        .map(|triple| {
                            triple.parse::<RelationScope>().map_err(|_| ConfigError::Invalid {
                                key: OWNED_RELATIONS.to_string(),
                                value: triple.clone(),
                                expected: "Start:TYPE:End triples".to_string(),
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?,
            max_prune_pct,
            delete_staging_on_success: config
                .get_bool_or(DELETE_STAGING_ON_SUCCESS, defaults.delete_staging_on_success)?,
        })
    }
}

/// A prune scope that could not be pruned
#[derive(Debug, Clone, PartialEq)]
pub struct PruneFailure {
    pub scope: PruneScope,
    pub reason: String,
}

impl fmt::Display for PruneFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.reason)
    }
}

/// Outcome of one publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSummary {
    pub tag: RunTag,
    pub node_batches: usize,
    pub relation_batches: usize,
    pub nodes_merged: usize,
    pub relations_merged: usize,
    /// Entities removed per pruned scope
    pub pruned: Vec<(PruneScope, usize)>,
    pub failed_scopes: Vec<PruneFailure>,
}

impl PublishSummary {
    pub fn total_pruned(&self) -> usize {
        self.pruned.iter().map(|(_, count)| count).sum()
    }

    /// Upserted and every owned scope pruned
    pub fn is_complete(&self) -> bool {
        self.failed_scopes.is_empty()
    }
}

pub struct GraphPublisher {
    store: Arc<dyn GraphStore>,
    staging: Arc<dyn StagingStore>,
    config: Option<PublisherConfig>,
    ownership: OwnedScopes,
    cancel: CancellationToken,
}

impl GraphPublisher {
    pub fn new(store: Arc<dyn GraphStore>, staging: Arc<dyn StagingStore>) -> Self {
        Self {
            store,
            staging,
            config: None,
            ownership: OwnedScopes::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Scopes the published entity kind owns
    pub fn declare_ownership(&mut self, ownership: OwnedScopes) {
        self.ownership = ownership;
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Read options from the publisher's scoped configuration. A missing
    /// `job_publish_tag` fails here.
    pub fn init(&mut self, config: &Config) -> Result<(), PublishError> {
        self.configure(PublisherConfig::from_config(config)?);
        Ok(())
    }

    pub fn configure(&mut self, config: PublisherConfig) {
        self.config = Some(config);
    }

    pub fn config(&self) -> Option<&PublisherConfig> {
        self.config.as_ref()
    }

    pub fn scope(&self) -> &'static str {
        SCOPE
    }

    fn check_cancelled(&self) -> Result<(), PublishError> {
        if self.cancel.is_cancelled() {
            Err(PublishError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn upsert_node_batch(
        &self,
        config: &PublisherConfig,
        tag: &RunTag,
        name: &str,
    ) -> Result<usize, PublishError> {
        self.check_cancelled()?;
        let bytes = self.staging.read(name).map_err(StageError::from)?;
        let nodes = decode_nodes(name, &bytes)?;

        let merged = config
            .retry
            .run(name, || self.store.merge_nodes(&nodes, tag))
            .map_err(|source| PublishError::Upsert {
                batch: name.to_string(),
                source,
            })?;
        debug!("Merged {} node(s) from {}", merged, name);
        Ok(merged)
    }

    fn upsert_relation_batch(
        &self,
        config: &PublisherConfig,
        tag: &RunTag,
        name: &str,
    ) -> Result<usize, PublishError> {
        self.check_cancelled()?;
        let bytes = self.staging.read(name).map_err(StageError::from)?;
        let relations = decode_relations(name, &bytes)?;
        if relations.is_empty() {
            return Ok(0);
        }

        let merged = config
            .retry
            .run(name, || self.store.merge_relations(&relations, tag))
            .map_err(|source| PublishError::Upsert {
                batch: name.to_string(),
                source,
            })?;
        debug!("Merged {} relationship(s) from {}", merged, name);
        Ok(merged)
    }

    fn upsert_all<T, F>(&self, names: &[String], parallel: bool, upsert: F) -> Result<Vec<T>, PublishError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, PublishError> + Sync + Send,
    {
        if parallel {
            names.par_iter().map(|name| upsert(name)).collect()
        } else {
            names.iter().map(|name| upsert(name)).collect()
        }
    }

    /// Scopes to prune: relationship triples, then exclusive labels, then
    /// shared labels, so that shared nodes are judged after the edges that
    /// held them were removed
    fn prune_scopes(&self, config: &PublisherConfig) -> Vec<PruneScope> {
        let declared = &self.ownership;
        let relations = config.owned_relations.as_ref().unwrap_or(&declared.relations);
        let labels = config.owned_labels.as_ref().unwrap_or(&declared.labels);
        let shared = config.shared_labels.as_ref().unwrap_or(&declared.shared_labels);

        let mut scopes: Vec<PruneScope> = Vec::new();
        let candidates = relations
            .iter()
            .cloned()
            .map(PruneScope::Relation)
            .chain(labels.iter().cloned().map(PruneScope::Label))
            .chain(
                shared
                    .iter()
                    .filter(|label| !labels.contains(label))
                    .cloned()
                    .map(PruneScope::SharedLabel),
            );
        for scope in candidates {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes
    }

    fn prune_scope(
        &self,
        config: &PublisherConfig,
        tag: &RunTag,
        scope: &PruneScope,
    ) -> Result<usize, String> {
        let counts = config
            .retry
            .run(&format!("counting {}", scope), || {
                self.store.scope_counts(scope, tag)
            })
            .map_err(|e| e.to_string())?;

        if counts.stale_pct() > config.max_prune_pct as f64 {
            return Err(format!(
                "{} of {} entities are stale ({:.1}%), above the {}% limit",
                counts.stale,
                counts.total,
                counts.stale_pct(),
                config.max_prune_pct
            ));
        }
        if counts.stale == 0 {
            return Ok(0);
        }

        config
            .retry
            .run(&format!("pruning {}", scope), || self.store.prune(scope, tag))
            .map_err(|e| e.to_string())
    }

    /// Upsert every staged batch under the configured tag, then prune
    pub fn publish(&self) -> Result<PublishSummary, PublishError> {
        let config = self.config.as_ref().ok_or(PublishError::NotInitialized)?;
        self.publish_as(&config.tag)
    }

    /// Upsert every staged batch stamped with `tag`, then prune entities of
    /// the owned scopes carrying any other tag
    pub fn publish_as(&self, tag: &RunTag) -> Result<PublishSummary, PublishError> {
        let config = self.config.as_ref().ok_or(PublishError::NotInitialized)?;
        let node_names = self.staging.list(NODES_DIR).map_err(StageError::from)?;
        let relation_names = self
            .staging
            .list(RELATIONSHIPS_DIR)
            .map_err(StageError::from)?;
        info!(
            "Publishing {} node batch(es) and {} relationship batch(es) as '{}'",
            node_names.len(),
            relation_names.len(),
            tag
        );

        // Nodes first so relationship endpoints already carry their attributes
        let nodes_merged: usize = self
            .upsert_all(&node_names, config.parallel_upsert, |name| {
                self.upsert_node_batch(config, tag, name)
            })
            .map_err(abort)?
            .into_iter()
            .sum();
        let relations_merged: usize = self
            .upsert_all(&relation_names, config.parallel_upsert, |name| {
                self.upsert_relation_batch(config, tag, name)
            })
            .map_err(abort)?
            .into_iter()
            .sum();

        config
            .retry
            .run("flush", || self.store.flush())
            .map_err(|e| abort(PublishError::Flush(e)))?;

        let mut summary = PublishSummary {
            tag: tag.clone(),
            node_batches: node_names.len(),
            relation_batches: relation_names.len(),
            nodes_merged,
            relations_merged,
            pruned: Vec::new(),
            failed_scopes: Vec::new(),
        };
        info!(
            "Upserted {} node(s) and {} relationship(s)",
            summary.nodes_merged, summary.relations_merged
        );

        if config.prune {
            let scopes = self.prune_scopes(config);
            if scopes.is_empty() {
                warn!("No owned scopes declared, nothing is pruned");
            }
            for scope in scopes {
                self.check_cancelled().map_err(abort)?;
                match self.prune_scope(config, tag, &scope) {
                    Ok(removed) => {
                        if removed > 0 {
                            info!("Pruned {} stale entities from {}", removed, scope);
                        }
                        summary.pruned.push((scope, removed));
                    }
                    Err(reason) => {
                        error!("Not pruning {}: {}", scope, reason);
                        summary.failed_scopes.push(PruneFailure { scope, reason });
                    }
                }
            }
            config
                .retry
                .run("flush", || self.store.flush())
                .map_err(PublishError::Flush)?;
        } else {
            info!("Pruning disabled");
        }

        if config.delete_staging_on_success && summary.is_complete() {
            self.staging.clear().map_err(StageError::from)?;
            debug!("Removed staged batches");
        }

        info!(
            "Published '{}': {} merged, {} pruned, {} scope(s) failed",
            summary.tag,
            summary.nodes_merged + summary.relations_merged,
            summary.total_pruned(),
            summary.failed_scopes.len()
        );
        Ok(summary)
    }
}

fn abort(err: PublishError) -> PublishError {
    warn!("Publish aborted, stale entities are kept: {}", err);
    err
}
