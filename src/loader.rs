//! Source loading for the structured inputs.
//!
//! Reads the entity and metric tables (CSV) and the reference metadata
//! (JSON array of objects). Each reader returns an explicit
//! [`SourceError`]; the `*_or_empty` wrappers log it and degrade to an
//! empty collection so a bad source never stops the process.
//!
//! Cells are always strings. Empty cells, short rows, JSON `null` and the
//! usual spreadsheet missing-value spellings (`NaN`, `N/A`, `NULL`, ...)
//! all become `""`.

use std::path::{Path, PathBuf};

use crate::models::{EntityRecord, Fields, ReferenceRecord, Table};

/// Cell spellings treated as "no value" when reading CSV.
const MISSING_SENTINELS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source not found: {}", .path.display())]
    Missing { path: PathBuf },
    #[error("failed to parse {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl SourceError {
    fn malformed(path: &Path, reason: impl ToString) -> Self {
        SourceError::Malformed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Reads a CSV file with a header row into a [`Table`].
pub fn load_table(path: &Path) -> Result<Table, SourceError> {
    if !path.exists() {
        return Err(SourceError::Missing {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SourceError::malformed(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::malformed(path, e))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(SourceError::malformed(path, "missing header row"));
    }
    let columns = dedupe_headers(path, columns);

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| SourceError::malformed(path, e))?;
        if record.len() > columns.len() {
            return Err(SourceError::malformed(
                path,
                format!(
                    "row {} has {} fields, header has {}",
                    i + 2,
                    record.len(),
                    columns.len()
                ),
            ));
        }
        let mut row: Vec<String> = record.iter().map(clean_cell).collect();
        row.resize(columns.len(), String::new());
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Renames repeated header names to `name.1`, `name.2`, ... so every cell
/// keeps a distinct key. Blank headers are left alone.
fn dedupe_headers(path: &Path, columns: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for name in columns {
        if name.is_empty() || !out.contains(&name) {
            out.push(name);
            continue;
        }
        let mut n = 1;
        let renamed = loop {
            let candidate = format!("{}.{}", name, n);
            if !out.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(
            path = %path.display(),
            column = %name,
            renamed = %renamed,
            "duplicate column header renamed"
        );
        out.push(renamed);
    }
    out
}

fn clean_cell(raw: &str) -> String {
    if MISSING_SENTINELS.contains(&raw.trim()) {
        String::new()
    } else {
        raw.to_string()
    }
}

/// [`load_table`], logging failures and returning an empty table instead.
pub fn load_table_or_empty(path: &Path) -> Table {
    load_table(path).unwrap_or_else(|e| {
        log_source_error(&e);
        Table::default()
    })
}

/// Reads a JSON array of objects into reference records.
///
/// Scalars are stringified explicitly; nested arrays and objects keep their
/// compact JSON text.
pub fn load_reference(path: &Path) -> Result<Vec<ReferenceRecord>, SourceError> {
    if !path.exists() {
        return Err(SourceError::Missing {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| SourceError::malformed(path, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| SourceError::malformed(path, e))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Err(SourceError::malformed(path, "expected a JSON array")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            serde_json::Value::Object(map) => Ok(ReferenceRecord {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, stringify_json(v)))
                    .collect(),
            }),
            _ => Err(SourceError::malformed(
                path,
                format!("element {} is not an object", i),
            )),
        })
        .collect()
}

/// [`load_reference`], logging failures and returning no records instead.
pub fn load_reference_or_empty(path: &Path) -> Vec<ReferenceRecord> {
    load_reference(path).unwrap_or_else(|e| {
        log_source_error(&e);
        Vec::new()
    })
}

fn stringify_json(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Builds entity records from a loaded table, keyed by `id_column`.
///
/// A table without the identity column still yields records (with an empty
/// `entity_id`) so free-text fields stay searchable.
pub fn entities_from_table(table: &Table, id_column: &str) -> Vec<EntityRecord> {
    if !table.is_empty() && !table.has_column(id_column) {
        tracing::warn!(
            column = id_column,
            "entity table has no identity column; records will not match by id"
        );
    }

    table
        .records()
        .map(|fields: Fields| EntityRecord {
            entity_id: fields.get(id_column).trim().to_string(),
            fields,
        })
        .collect()
}

/// Loads the entity table, degrading to no records on failure.
pub fn load_entities(path: &Path, id_column: &str) -> Vec<EntityRecord> {
    entities_from_table(&load_table_or_empty(path), id_column)
}

fn log_source_error(err: &SourceError) {
    match err {
        SourceError::Missing { path } => {
            tracing::warn!(path = %path.display(), "source not found; continuing with no records")
        }
        SourceError::Malformed { path, reason } => {
            tracing::error!(path = %path.display(), %reason, "failed to read source; continuing with no records")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_table_is_distinguished_from_malformed() {
        let tmp = TempDir::new().unwrap();
        let err = load_table(&tmp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Missing { .. }));

        let bad = write(&tmp, "bad.csv", "a,b\n1,2,3\n");
        let err = load_table(&bad).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn or_empty_degrades() {
        let tmp = TempDir::new().unwrap();
        assert!(load_table_or_empty(&tmp.path().join("absent.csv")).is_empty());
        assert!(load_reference_or_empty(&tmp.path().join("absent.json")).is_empty());
        let bad = write(&tmp, "bad.json", "{ not json");
        assert!(load_reference_or_empty(&bad).is_empty());
    }

    #[test]
    fn empty_and_sentinel_cells_become_empty_strings() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "students.csv",
            "student_id,name,gpa,email\nS1,Ada Lovelace,NaN,\nS2,Alan Turing\nS3,null,N/A,at@x.org\n",
        );
        let table = load_table(&path).unwrap();
        assert_eq!(table.rows.len(), 3);
        for row in &table.rows {
            assert_eq!(row.len(), 4);
            for cell in row {
                let lower = cell.to_lowercase();
                assert!(lower != "nan" && lower != "null" && lower != "n/a");
            }
        }
        assert_eq!(table.rows[0], vec!["S1", "Ada Lovelace", "", ""]);
        assert_eq!(table.rows[1], vec!["S2", "Alan Turing", "", ""]);
        assert_eq!(table.rows[2][3], "at@x.org");
    }

    #[test]
    fn headers_are_trimmed_and_bom_stripped() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "t.csv", "\u{feff}student_id , name\nS1,Ada\n");
        let table = load_table(&path).unwrap();
        assert_eq!(table.columns, vec!["student_id", "name"]);
    }

    #[test]
    fn empty_file_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "empty.csv", "");
        assert!(matches!(
            load_table(&path).unwrap_err(),
            SourceError::Malformed { .. }
        ));
    }

    #[test]
    fn reference_values_are_stringified() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "courses.json",
            r#"[{"course_id": "CS101", "title": "Intro", "credits": 3, "core": true, "lecturer": null, "tags": ["a"]}]"#,
        );
        let refs = load_reference(&path).unwrap();
        assert_eq!(refs.len(), 1);
        let f = &refs[0].fields;
        assert_eq!(f.get("course_id"), "CS101");
        assert_eq!(f.get("credits"), "3");
        assert_eq!(f.get("core"), "true");
        assert_eq!(f.get("lecturer"), "");
        assert_eq!(f.get("tags"), r#"["a"]"#);
    }

    #[test]
    fn duplicate_headers_get_numbered_suffixes() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "grades.csv",
            "student_id,CS101,CS101,CS101.1,CS101\nS1,88,40,12,7\n",
        );
        let table = load_table(&path).unwrap();
        assert_eq!(
            table.columns,
            vec!["student_id", "CS101", "CS101.1", "CS101.1.1", "CS101.2"]
        );

        let entities = entities_from_table(&table, "student_id");
        let fields = &entities[0].fields;
        assert_eq!(fields.len(), 5);
        assert_eq!(fields.get("CS101"), "88");
        assert_eq!(fields.get("CS101.1"), "40");
        assert_eq!(fields.get("CS101.1.1"), "12");
        assert_eq!(fields.get("CS101.2"), "7");
    }

    #[test]
    fn reference_must_be_array_of_objects() {
        let tmp = TempDir::new().unwrap();
        let obj = write(&tmp, "obj.json", r#"{"course_id": "CS101"}"#);
        assert!(matches!(
            load_reference(&obj).unwrap_err(),
            SourceError::Malformed { .. }
        ));
        let mixed = write(&tmp, "mixed.json", r#"[{"course_id": "CS101"}, 4]"#);
        assert!(load_reference(&mixed).is_err());
    }

    #[test]
    fn entities_keep_trimmed_id_and_all_fields() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "students.csv",
            "student_id,name,programme\n  S1 ,Ada Lovelace,Computing\n",
        );
        let entities = load_entities(&path, "student_id");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_id, "S1");
        assert_eq!(entities[0].fields.get("name"), "Ada Lovelace");
        assert_eq!(entities[0].fields.len(), 3);
    }
}
