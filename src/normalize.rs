//! Metric table normalization.
//!
//! Scores arrive either *wide* (one row per student, one column per course)
//! or *long* (one row per student/course pair). Both are reshaped into
//! [`MetricRecord`]s and then left-joined with the reference metadata on the
//! metric key.
//!
//! Layout is taken from configuration when set. In `auto` mode a table is
//! wide when it has the identity column and more than two columns. A long
//! table with `student_id,course_id,score` satisfies that rule too, so auto
//! mode warns when it picks wide for a table that already carries the
//! metric-key column.

use std::collections::HashMap;
use std::fmt;

use crate::config::{LayoutMode, SchemaConfig};
use crate::models::{Fields, MetricRecord, ReferenceRecord, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Wide,
    Long,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Wide => write!(f, "wide"),
            Layout::Long => write!(f, "long"),
        }
    }
}

/// The column-count heuristic, with no configuration applied.
pub fn detect_layout(table: &Table, schema: &SchemaConfig) -> Layout {
    if table.has_column(&schema.entity_id) && table.columns.len() > 2 {
        Layout::Wide
    } else {
        Layout::Long
    }
}

/// Decides the layout for `table` under `mode`.
pub fn resolve_layout(table: &Table, schema: &SchemaConfig, mode: LayoutMode) -> Layout {
    match mode {
        LayoutMode::Wide if !table.has_column(&schema.entity_id) => {
            tracing::warn!(
                column = %schema.entity_id,
                "layout = \"wide\" but the metric table has no identity column; reading it as long"
            );
            Layout::Long
        }
        LayoutMode::Wide => Layout::Wide,
        LayoutMode::Long => Layout::Long,
        LayoutMode::Auto => {
            let layout = detect_layout(table, schema);
            if layout == Layout::Wide && table.has_column(&schema.metric_key) {
                tracing::warn!(
                    column = %schema.metric_key,
                    "metric table detected as wide but has a metric-key column; \
                     set [normalize] layout = \"long\" if it is already one row per pair"
                );
            }
            layout
        }
    }
}

/// Reshapes the metric table to long form and merges reference metadata.
///
/// A table with no rows yields no records.
pub fn normalize(
    table: &Table,
    reference: &[ReferenceRecord],
    schema: &SchemaConfig,
    mode: LayoutMode,
) -> Vec<MetricRecord> {
    if table.is_empty() {
        return Vec::new();
    }

    let layout = resolve_layout(table, schema, mode);
    tracing::debug!(%layout, rows = table.rows.len(), "normalizing metric table");

    let (records, has_key) = match layout {
        Layout::Wide => (pivot_wide(table, &schema.entity_id), true),
        Layout::Long => (from_long(table, schema), table.has_column(&schema.metric_key)),
    };

    if !has_key {
        if !reference.is_empty() {
            tracing::warn!(
                column = %schema.metric_key,
                "metric table has no metric-key column; reference metadata not merged"
            );
        }
        return records;
    }

    merge_reference(records, reference, schema)
}

/// Turns every non-identity column into a (metric_key, value) pair per row.
///
/// Output is column-major: all rows for the first metric column, then the
/// next. Columns with a blank header are skipped. Empty cells are kept.
pub fn pivot_wide(table: &Table, id_column: &str) -> Vec<MetricRecord> {
    let Some(id_idx) = table.column_index(id_column) else {
        return Vec::new();
    };

    let metric_columns: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != id_idx && !name.trim().is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut out = Vec::with_capacity(metric_columns.len() * table.rows.len());
    for &col in &metric_columns {
        for row in &table.rows {
            let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
            out.push(MetricRecord {
                entity_id: cell(id_idx).trim().to_string(),
                metric_key: table.columns[col].clone(),
                value: cell(col).to_string(),
                metadata: Fields::new(),
            });
        }
    }
    out
}

/// Reads an already-long table as-is.
pub fn from_long(table: &Table, schema: &SchemaConfig) -> Vec<MetricRecord> {
    table
        .records()
        .map(|fields| {
            let metadata = fields
                .iter()
                .filter(|(k, _)| {
                    *k != schema.entity_id && *k != schema.metric_key && *k != schema.metric_value
                })
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            MetricRecord {
                entity_id: fields.get(&schema.entity_id).trim().to_string(),
                metric_key: fields.get(&schema.metric_key).trim().to_string(),
                value: fields.get(&schema.metric_value).to_string(),
                metadata,
            }
        })
        .collect()
}

/// Left-outer join of `records` with `reference` on the metric key.
///
/// Unmatched records get every reference field as `""`. A reference key
/// present more than once fans out into one record per match. Reference
/// fields never overwrite fields the record already has.
pub fn merge_reference(
    records: Vec<MetricRecord>,
    reference: &[ReferenceRecord],
    schema: &SchemaConfig,
) -> Vec<MetricRecord> {
    if reference.is_empty() {
        return records;
    }
    let key = schema.metric_key.as_str();
    if !reference.iter().any(|r| r.fields.contains(key)) {
        tracing::warn!(
            column = key,
            "reference metadata has no metric-key field; not merged"
        );
        return records;
    }

    let mut ref_columns: Vec<&str> = Vec::new();
    for r in reference {
        for (name, _) in r.fields.iter() {
            if name != key && !ref_columns.contains(&name) {
                ref_columns.push(name);
            }
        }
    }

    let mut index: HashMap<&str, Vec<&ReferenceRecord>> = HashMap::new();
    for r in reference {
        let k = r.fields.get(key).trim();
        if !k.is_empty() {
            index.entry(k).or_default().push(r);
        }
    }

    let reserved = |name: &str| name == schema.entity_id || name == schema.metric_value;

    let mut out = Vec::with_capacity(records.len());
    let mut unmatched = 0usize;
    for record in records {
        match index.get(record.metric_key.trim()) {
            Some(matches) => {
                for m in matches {
                    let mut joined = record.clone();
                    for &col in &ref_columns {
                        if !reserved(col) && !joined.metadata.contains(col) {
                            joined.metadata.insert(col, m.fields.get(col));
                        }
                    }
                    out.push(joined);
                }
            }
            None => {
                unmatched += 1;
                let mut blank = record;
                for &col in &ref_columns {
                    if !reserved(col) && !blank.metadata.contains(col) {
                        blank.metadata.insert(col, "");
                    }
                }
                out.push(blank);
            }
        }
    }

    if unmatched > 0 {
        tracing::debug!(unmatched, "metric records without reference metadata");
    }
    out
}
