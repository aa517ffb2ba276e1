//! The loaded, read-only state every query runs against.
//!
//! A [`Snapshot`] is built once at startup from the configured sources and
//! never changes afterwards; the server shares it behind an `Arc` without
//! locking. Source failures have already been absorbed by the loader, so
//! building a snapshot cannot fail.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::corpus::{Corpus, LookupError};
use crate::extract::Extractor;
use crate::filter::{filter, Category};
use crate::loader;
use crate::models::{EntityRecord, MetricRecord, QueryResultSet, ResultCounts};
use crate::normalize;
use crate::search::{search, SearchContext};

/// Result of [`Snapshot::handle_query`]: the filtered results plus counts.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub category: Category,
    pub counts: ResultCounts,
    pub results: QueryResultSet,
}

#[derive(Debug)]
pub struct Snapshot {
    config: Config,
    entities: Vec<EntityRecord>,
    metrics: Vec<MetricRecord>,
    corpus: Corpus,
}

impl Snapshot {
    /// Loads and normalizes every configured source.
    pub fn load(config: &Config) -> Self {
        let sources = &config.sources;
        let schema = &config.schema;

        let entities = loader::load_entities(&sources.entities, &schema.entity_id);
        let metric_table = loader::load_table_or_empty(&sources.metrics);
        let reference = loader::load_reference_or_empty(&sources.reference);
        let metrics =
            normalize::normalize(&metric_table, &reference, schema, config.normalize.layout);

        let corpus = Corpus::new(&sources.documents);
        if !corpus.exists() {
            tracing::warn!(
                path = %sources.documents.display(),
                "document root not found; create it with one folder per entity"
            );
        }

        tracing::info!(
            entities = entities.len(),
            metrics = metrics.len(),
            reference = reference.len(),
            "snapshot loaded"
        );

        Self::from_parts(config.clone(), entities, metrics, corpus)
    }

    pub fn from_parts(
        config: Config,
        entities: Vec<EntityRecord>,
        metrics: Vec<MetricRecord>,
        corpus: Corpus,
    ) -> Self {
        Self {
            config,
            entities,
            metrics,
            corpus,
        }
    }

    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    pub fn metrics(&self) -> &[MetricRecord] {
        &self.metrics
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Unfiltered results for `query`.
    pub fn search(&self, query: &str) -> QueryResultSet {
        let ctx = SearchContext {
            entities: &self.entities,
            metrics: &self.metrics,
            corpus: &self.corpus,
            schema: &self.config.schema,
            extractor: Extractor::new(self.config.search.max_document_bytes),
            preview_chars: self.config.search.preview_chars,
        };
        search(query, &ctx)
    }

    /// Searches, applies the category filter and counts what is left.
    pub fn handle_query(&self, query: &str, category: Category) -> QueryResponse {
        let results = filter(self.search(query), category);
        QueryResponse {
            query: query.trim().to_string(),
            category,
            counts: results.counts(),
            results,
        }
    }

    /// Path of a stored document for raw delivery. No extraction happens.
    pub fn resolve_document_path(
        &self,
        entity_id: &str,
        filename: &str,
    ) -> Result<PathBuf, LookupError> {
        self.corpus.resolve_document_path(entity_id, filename)
    }
}
