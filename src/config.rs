//! TOML configuration parsing.
//!
//! A single file names the four sources (entity table, metric table,
//! reference metadata, document root), the column names the matcher keys
//! on, and the knobs for layout detection and previews. Relative source
//! paths are resolved against the directory holding the config file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Entity table (CSV), one row per student.
    pub entities: PathBuf,
    /// Metric table (CSV), wide or long.
    pub metrics: PathBuf,
    /// Reference metadata (JSON array of objects).
    pub reference: PathBuf,
    /// Root of the per-entity document folders.
    pub documents: PathBuf,
}

/// Column names the normalizer and matcher key on.
#[derive(Debug, Deserialize, Clone)]
pub struct SchemaConfig {
    #[serde(default = "default_entity_id")]
    pub entity_id: String,
    #[serde(default = "default_metric_key")]
    pub metric_key: String,
    #[serde(default = "default_metric_value")]
    pub metric_value: String,
    #[serde(default = "default_entity_search_fields")]
    pub entity_search_fields: Vec<String>,
    #[serde(default = "default_metric_text_fields")]
    pub metric_text_fields: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id(),
            metric_key: default_metric_key(),
            metric_value: default_metric_value(),
            entity_search_fields: default_entity_search_fields(),
            metric_text_fields: default_metric_text_fields(),
        }
    }
}

fn default_entity_id() -> String {
    "student_id".to_string()
}
fn default_metric_key() -> String {
    "course_id".to_string()
}
fn default_metric_value() -> String {
    "score".to_string()
}
fn default_entity_search_fields() -> Vec<String> {
    vec![
        "name".to_string(),
        "programme".to_string(),
        "email".to_string(),
    ]
}
fn default_metric_text_fields() -> Vec<String> {
    vec!["title".to_string(), "lecturer".to_string()]
}

/// How the metric table's layout is decided.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Wide if the identity column is present and there are more than two columns.
    #[default]
    Auto,
    Wide,
    Long,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub layout: LayoutMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Documents larger than this are treated as having no text.
    #[serde(default)]
    pub max_document_bytes: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            max_document_bytes: None,
        }
    }
}

fn default_preview_chars() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Config {
    /// Config rooted at `base` using the conventional file names
    /// (`students.csv`, `grades.csv`, `courses.json`, `unstructured/`).
    pub fn with_base(base: &Path) -> Self {
        Self {
            sources: SourcesConfig {
                entities: base.join("students.csv"),
                metrics: base.join("grades.csv"),
                reference: base.join("courses.json"),
                documents: base.join("unstructured"),
            },
            schema: SchemaConfig::default(),
            normalize: NormalizeConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }

    fn resolve_relative(&mut self, base: &Path) {
        for path in [
            &mut self.sources.entities,
            &mut self.sources.metrics,
            &mut self.sources.reference,
            &mut self.sources.documents,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_relative(base);

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.search.preview_chars == 0 {
        anyhow::bail!("search.preview_chars must be > 0");
    }
    if config.search.max_document_bytes == Some(0) {
        anyhow::bail!("search.max_document_bytes must be > 0 when set");
    }

    let schema = &config.schema;
    for (key, value) in [
        ("schema.entity_id", &schema.entity_id),
        ("schema.metric_key", &schema.metric_key),
        ("schema.metric_value", &schema.metric_value),
    ] {
        if value.trim().is_empty() {
            anyhow::bail!("{} must not be empty", key);
        }
    }
    if schema
        .entity_search_fields
        .iter()
        .chain(schema.metric_text_fields.iter())
        .any(|f| f.trim().is_empty())
    {
        anyhow::bail!("schema search fields must not contain empty names");
    }

    Ok(())
}
