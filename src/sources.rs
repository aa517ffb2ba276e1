use anyhow::Result;

use crate::config::Config;
use crate::corpus::Corpus;
use crate::loader::{self, SourceError};
use crate::normalize;

/// Health of one configured source, as shown by `air sources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: &'static str,
    pub status: &'static str,
    /// Rows, records or entity folders, depending on the source.
    pub count: usize,
    pub detail: String,
}

fn status_of<T>(
    name: &'static str,
    loaded: Result<T, SourceError>,
    count: impl Fn(&T) -> usize,
    detail: impl Fn(&T) -> String,
) -> SourceStatus {
    match loaded {
        Ok(value) => SourceStatus {
            name,
            status: "OK",
            count: count(&value),
            detail: detail(&value),
        },
        Err(e @ SourceError::Missing { .. }) => SourceStatus {
            name,
            status: "MISSING",
            count: 0,
            detail: e.to_string(),
        },
        Err(e @ SourceError::Malformed { .. }) => SourceStatus {
            name,
            status: "INVALID",
            count: 0,
            detail: e.to_string(),
        },
    }
}

pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    let sources = &config.sources;
    let schema = &config.schema;

    let entities = status_of(
        "entities",
        loader::load_table(&sources.entities),
        |t| t.rows.len(),
        |_| sources.entities.display().to_string(),
    );

    let metrics = status_of(
        "metrics",
        loader::load_table(&sources.metrics),
        |t| t.rows.len(),
        |t| {
            let layout = normalize::resolve_layout(t, schema, config.normalize.layout);
            format!("{} ({} layout)", sources.metrics.display(), layout)
        },
    );

    let reference = status_of(
        "reference",
        loader::load_reference(&sources.reference),
        |r| r.len(),
        |_| sources.reference.display().to_string(),
    );

    let corpus = Corpus::new(&sources.documents);
    let documents = if corpus.exists() {
        SourceStatus {
            name: "documents",
            status: "OK",
            count: corpus.entity_folders().len(),
            detail: sources.documents.display().to_string(),
        }
    } else {
        SourceStatus {
            name: "documents",
            status: "MISSING",
            count: 0,
            detail: sources.documents.display().to_string(),
        }
    };

    vec![entities, metrics, reference, documents]
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<10} {:>7}  DETAIL", "SOURCE", "STATUS", "COUNT");
    for s in source_statuses(config) {
        println!("{:<12} {:<10} {:>7}  {}", s.name, s.status, s.count, s.detail);
    }
    Ok(())
}
