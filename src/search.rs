//! Cross-source query matching.
//!
//! A query is trimmed and lowercased once, then matched as a plain
//! substring against three sources in a fixed order:
//!
//! 1. **Entities**: id equals the query, or a configured free-text field
//!    contains it. Each matching entity also pulls in its whole document
//!    folder as placeholder hits.
//! 2. **Metrics**: entity id, metric key, or a configured metadata field
//!    contains the query.
//! 3. **Documents**: every file under every entity folder, matched by folder
//!    name (exact), filename, then extracted text.
//!
//! Document hits are unique by `(entity_id, filename)` for the whole query;
//! step 3 never repeats a file step 1 already returned. Extraction is
//! memoized in a [`TextCache`] that lives for one query only, so changed
//! files are picked up by the next query.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::{Config, SchemaConfig};
use crate::corpus::Corpus;
use crate::extract::Extractor;
use crate::filter::Category;
use crate::models::{DocumentHit, DocumentRef, EntityRecord, MetricRecord, QueryResultSet};
use crate::snapshot::Snapshot;

/// Preview for documents listed because their owner matched.
pub const PLACEHOLDER_PREVIEW: &str = "(document available)";
/// Preview for filename matches whose text could not be extracted.
pub const NO_TEXT_PREVIEW: &str = "(no extractable text)";

/// Everything a query reads. Borrowed from the loaded snapshot.
pub struct SearchContext<'a> {
    pub entities: &'a [EntityRecord],
    pub metrics: &'a [MetricRecord],
    pub corpus: &'a Corpus,
    pub schema: &'a SchemaConfig,
    pub extractor: Extractor,
    pub preview_chars: usize,
}

/// Per-query memo of extracted document text.
pub struct TextCache {
    extractor: Extractor,
    texts: HashMap<PathBuf, String>,
    extractions: usize,
}

impl TextCache {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            texts: HashMap::new(),
            extractions: 0,
        }
    }

    /// Text of `path`, extracting it on first request.
    pub fn text(&mut self, path: &Path) -> &str {
        let extractor = self.extractor;
        let extractions = &mut self.extractions;
        self.texts.entry(path.to_path_buf()).or_insert_with(|| {
            *extractions += 1;
            extractor.extract_text(path)
        })
    }

    /// Number of files actually extracted so far.
    pub fn extractions(&self) -> usize {
        self.extractions
    }
}

/// Runs `query` against all three sources.
///
/// A blank query matches nothing.
pub fn search(query: &str, ctx: &SearchContext<'_>) -> QueryResultSet {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return QueryResultSet::default();
    }

    let mut results = QueryResultSet::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    match_entities(&q, ctx, &mut results, &mut seen);
    match_metrics(&q, ctx, &mut results);

    let mut cache = TextCache::new(ctx.extractor);
    match_documents(&q, ctx, &mut cache, &mut results, &mut seen);

    tracing::debug!(
        query = %q,
        entities = results.entities.len(),
        metrics = results.metrics.len(),
        documents = results.documents.len(),
        extracted = cache.extractions(),
        "query complete"
    );
    results
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn match_entities(
    q: &str,
    ctx: &SearchContext<'_>,
    results: &mut QueryResultSet,
    seen: &mut HashSet<(String, String)>,
) {
    for entity in ctx.entities {
        let by_id = !entity.entity_id.is_empty() && entity.entity_id.to_lowercase() == q;
        let by_text = ctx
            .schema
            .entity_search_fields
            .iter()
            .any(|field| contains_ci(entity.fields.get(field), q));
        if !(by_id || by_text) {
            continue;
        }

        results.entities.push(entity.clone());
        for doc in ctx.corpus.list_documents(&entity.entity_id) {
            push_hit(results, seen, doc, PLACEHOLDER_PREVIEW.to_string());
        }
    }
}

fn match_metrics(q: &str, ctx: &SearchContext<'_>, results: &mut QueryResultSet) {
    for record in ctx.metrics {
        let matched = contains_ci(&record.entity_id, q)
            || contains_ci(&record.metric_key, q)
            || ctx
                .schema
                .metric_text_fields
                .iter()
                .any(|field| contains_ci(record.field(field, ctx.schema), q));
        if matched {
            results.metrics.push(record.clone());
        }
    }
}

fn match_documents(
    q: &str,
    ctx: &SearchContext<'_>,
    cache: &mut TextCache,
    results: &mut QueryResultSet,
    seen: &mut HashSet<(String, String)>,
) {
    for folder in ctx.corpus.entity_folders() {
        let folder_is_query = folder.to_lowercase() == q;
        for doc in ctx.corpus.list_folder(&folder) {
            if seen.contains(&(doc.entity_id.clone(), doc.filename.clone())) {
                continue;
            }

            let snippet = if folder_is_query {
                PLACEHOLDER_PREVIEW.to_string()
            } else if contains_ci(&doc.filename, q) {
                let text = cache.text(&doc.path);
                if text.is_empty() {
                    NO_TEXT_PREVIEW.to_string()
                } else {
                    preview(text, ctx.preview_chars)
                }
            } else {
                let text = cache.text(&doc.path);
                if text.is_empty() || !contains_ci(text, q) {
                    continue;
                }
                preview(text, ctx.preview_chars)
            };

            push_hit(results, seen, doc, snippet);
        }
    }
}

fn push_hit(
    results: &mut QueryResultSet,
    seen: &mut HashSet<(String, String)>,
    doc: DocumentRef,
    preview: String,
) {
    if seen.insert((doc.entity_id.clone(), doc.filename.clone())) {
        results.documents.push(DocumentHit {
            entity_id: doc.entity_id,
            filename: doc.filename,
            preview,
        });
    }
}

/// First `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// CLI entry point: loads the sources, runs one query and prints it.
pub fn run_search(config: &Config, query: &str, category: Category, json: bool) -> Result<()> {
    let snapshot = Snapshot::load(config);
    let response = snapshot.handle_query(query, category);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let schema = &config.schema;
    let counts = &response.counts;

    if !response.results.entities.is_empty() {
        println!("--- Entities ({}) ---", counts.entities);
        for entity in &response.results.entities {
            println!("{}", entity.entity_id);
            for (name, value) in entity.fields.iter() {
                if name != schema.entity_id && !value.is_empty() {
                    println!("    {}: {}", name, value);
                }
            }
        }
        println!();
    }

    if !response.results.metrics.is_empty() {
        println!("--- Metrics ({}) ---", counts.metrics);
        for m in &response.results.metrics {
            println!("{} / {} = {}", m.entity_id, m.metric_key, m.value);
            for field in &schema.metric_text_fields {
                let value = m.metadata.get(field);
                if !value.is_empty() {
                    println!("    {}: {}", field, value);
                }
            }
        }
        println!();
    }

    if !response.results.documents.is_empty() {
        println!("--- Documents ({}) ---", counts.documents);
        for doc in &response.results.documents {
            println!("{}/{}", doc.entity_id, doc.filename);
            println!("    excerpt: \"{}\"", doc.preview.replace('\n', " ").trim());
        }
        println!();
    }

    Ok(())
}
