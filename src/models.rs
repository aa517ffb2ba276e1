//! Core data models used throughout the retrieval pipeline.
//!
//! These types represent the records loaded from the structured sources,
//! the document references listed from the corpus, and the result set a
//! query produces.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::PathBuf;

/// Ordered field-name → string-value list.
///
/// Keeps source column order for display. Lookups of absent fields yield
/// `""`, so matching never has to distinguish "missing" from "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    /// Sets `name`, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Raw table read from a CSV source: header row plus string cells.
///
/// Every row has exactly `columns.len()` cells; short rows are padded with
/// `""` at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Rows as ordered [`Fields`] keyed by header.
    pub fn records(&self) -> impl Iterator<Item = Fields> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }
}

/// One subject (a student). Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Trimmed identity value, case preserved.
    pub entity_id: String,
    /// All columns of the source row, identity included.
    pub fields: Fields,
}

impl Serialize for EntityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// A (entity_id, metric_key, value) triple plus joined reference metadata.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricRecord {
    pub entity_id: String,
    pub metric_key: String,
    pub value: String,
    /// Every other column: long-table extras, then reference fields.
    pub metadata: Fields,
}

impl MetricRecord {
    /// Reads a named field, with the identity/key/value columns resolved
    /// through `schema` names.
    pub fn field<'a>(&'a self, name: &str, schema: &crate::config::SchemaConfig) -> &'a str {
        if name == schema.entity_id {
            &self.entity_id
        } else if name == schema.metric_key {
            &self.metric_key
        } else if name == schema.metric_value {
            &self.value
        } else {
            self.metadata.get(name)
        }
    }
}

/// Descriptive metadata for one metric key (a course).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub fields: Fields,
}

/// A file in an entity's document folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub entity_id: String,
    pub filename: String,
    pub path: PathBuf,
}

/// A document matched by a query.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DocumentHit {
    pub entity_id: String,
    pub filename: String,
    pub preview: String,
}

/// The three result sequences a query produces, in match order.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueryResultSet {
    pub entities: Vec<EntityRecord>,
    pub metrics: Vec<MetricRecord>,
    pub documents: Vec<DocumentHit>,
}

impl QueryResultSet {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.metrics.is_empty() && self.documents.is_empty()
    }

    pub fn counts(&self) -> ResultCounts {
        ResultCounts {
            entities: self.entities.len(),
            metrics: self.metrics.len(),
            documents: self.documents.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResultCounts {
    pub entities: usize,
    pub metrics: usize,
    pub documents: usize,
}
