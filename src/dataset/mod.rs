//! Dataset loading: CSV parsing, identifier sanitization, type inference.
//!
//! An uploaded file becomes a [`Dataset`] — an ordered set of named columns
//! plus string rows — ready to be materialized into the embedded store.
//! Column names are sanitized to valid SQL identifiers and storage types are
//! inferred by scanning the column values.

use std::io::Read;
use std::path::Path;

use crate::types::{PipelineError, Result};

/// Storage type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// All non-empty values parse as integers.
    Integer,
    /// All non-empty values parse as numbers, at least one non-integer.
    Real,
    /// Everything else.
    Text,
}

impl ColumnType {
    /// SQLite type name used in `CREATE TABLE`.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// A named column with its inferred storage type.
#[derive(Debug, Clone)]
pub struct Column {
    /// Sanitized, unique column name.
    pub name: String,
    /// Inferred storage type.
    pub column_type: ColumnType,
}

/// Schema derived from an uploaded dataset.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Name of the table the dataset is materialized into.
    pub table_name: String,
    /// Columns in upload order.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Column names in upload order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Render the schema as `name TYPE, name TYPE, ...` for prompts.
    pub fn describe(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type.sql_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// An uploaded dataset held in memory before materialization.
///
/// Only one dataset is active per session; a new upload fully replaces the
/// prior one.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Derived schema (sanitized names, inferred types).
    pub schema: TableSchema,
    /// Row values as uploaded, one string cell per column.
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Parse delimited tabular content from any reader.
    ///
    /// A header row is required. Fails with
    /// [`PipelineError::MalformedInput`] on inconsistent column counts,
    /// unreadable encoding, or an empty header.
    pub fn from_csv_reader<R: Read>(reader: R, table_name: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| PipelineError::MalformedInput(format!("unreadable header row: {e}")))?
            .clone();

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(PipelineError::MalformedInput(
                "header row is empty".to_string(),
            ));
        }

        let names = sanitize_headers(&headers);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record
                .map_err(|e| PipelineError::MalformedInput(format!("bad record: {e}")))?;
            rows.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column {
                name,
                column_type: infer_column_type(rows.iter().map(|r| r[i].as_str())),
            })
            .collect();

        let dataset = Dataset {
            schema: TableSchema {
                table_name: table_name.to_string(),
                columns,
            },
            rows,
        };

        tracing::debug!(
            table = %dataset.schema.table_name,
            columns = dataset.schema.columns.len(),
            rows = dataset.rows.len(),
            "dataset parsed"
        );

        Ok(dataset)
    }

    /// Parse delimited tabular content from a string.
    pub fn from_csv_str(content: &str, table_name: &str) -> Result<Self> {
        Self::from_csv_reader(content.as_bytes(), table_name)
    }

    /// Parse a CSV file from disk.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, table_name: &str) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            PipelineError::MalformedInput(format!(
                "cannot open {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_csv_reader(file, table_name)
    }

    /// First `n` rows, for display before querying.
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..self.rows.len().min(n)]
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Sanitize raw header names into unique, valid SQL identifiers.
fn sanitize_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for raw in headers.iter() {
        let mut name = sanitize_identifier(raw);
        // Deduplicate by suffixing.
        if names.contains(&name) {
            let mut suffix = 2;
            while names.contains(&format!("{name}_{suffix}")) {
                suffix += 1;
            }
            name = format!("{name}_{suffix}");
        }
        names.push(name);
    }
    names
}

/// Reduce a raw header to valid identifier syntax.
///
/// Non `[A-Za-z0-9_]` characters become underscores, a leading digit gets a
/// `c_` prefix, and an empty result falls back to `col`.
fn sanitize_identifier(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        name = "col".to_string();
    }
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name = format!("c_{name}");
    }
    name
}

/// Infer a storage type from the values of one column.
///
/// Empty cells do not veto a numeric column; a column with no non-empty
/// values stays `TEXT`.
fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut saw_value = false;
    let mut all_integer = true;
    let mut all_numeric = true;

    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        saw_value = true;
        if value.parse::<i64>().is_err() {
            all_integer = false;
            if value.parse::<f64>().is_err() {
                all_numeric = false;
                break;
            }
        }
    }

    match (saw_value, all_integer, all_numeric) {
        (false, _, _) => ColumnType::Text,
        (true, true, _) => ColumnType::Integer,
        (true, false, true) => ColumnType::Real,
        _ => ColumnType::Text,
    }
}
