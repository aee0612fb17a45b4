//! Embedded SQLite store holding the single session dataset.
//!
//! One table per session. Loading a dataset fully replaces the previous
//! snapshot (`DROP TABLE IF EXISTS` + `CREATE TABLE` + inserts in one
//! transaction); nothing is mutated in place.

use rusqlite::Connection;
use serde_json::json;

use crate::dataset::{ColumnType, Dataset};
use crate::types::{PipelineError, Result};

/// A typed cell value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    /// JSON rendering for structured output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Integer(n) => json!(n),
            CellValue::Real(f) => json!(f),
            CellValue::Text(s) => json!(s),
        }
    }

    /// Plain-text rendering for display.
    pub fn to_display(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Integer(n) => n.to_string(),
            CellValue::Real(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<rusqlite::types::Value> for CellValue {
    fn from(value: rusqlite::types::Value) -> Self {
        match value {
            rusqlite::types::Value::Null => CellValue::Null,
            rusqlite::types::Value::Integer(n) => CellValue::Integer(n),
            rusqlite::types::Value::Real(f) => CellValue::Real(f),
            rusqlite::types::Value::Text(s) => CellValue::Text(s),
            rusqlite::types::Value::Blob(_) => CellValue::Text("[BLOB]".to_string()),
        }
    }
}

/// Ordered result of a successful query.
#[derive(Debug, Clone)]
pub struct ResultSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row data, one cell per column.
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    /// Number of rows returned.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows rendered as JSON objects keyed by column name.
    pub fn rows_as_json(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for (column, cell) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), cell.to_json());
                }
                serde_json::Value::Object(object)
            })
            .collect()
    }
}

/// SQL execution failure, fed back into the repair loop.
///
/// Deliberately not a [`PipelineError`]: the pipeline retries these and only
/// surfaces `QueryExecution` once attempts are exhausted.
#[derive(Debug, Clone)]
pub struct ExecFailure {
    /// The statement that failed.
    pub sql: String,
    /// Database error text.
    pub message: String,
}

/// In-memory SQLite store for the active dataset.
pub struct DatasetStore {
    conn: Connection,
    table_name: String,
}

impl DatasetStore {
    /// Open a fresh in-memory store for the given table name.
    pub fn open_in_memory(table_name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PipelineError::Storage(format!("failed to open in-memory database: {e}"))
        })?;
        Ok(Self {
            conn,
            table_name: table_name.to_string(),
        })
    }

    /// Name of the session table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Materialize a dataset, replacing any previous table of the same name.
    pub fn load(&mut self, dataset: &Dataset) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| PipelineError::Storage(format!("failed to begin transaction: {e}")))?;

        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", self.table_name))
            .map_err(|e| PipelineError::Storage(format!("failed to drop table: {e}")))?;

        let column_defs: Vec<String> = dataset
            .schema
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.column_type.sql_name()))
            .collect();
        tx.execute_batch(&format!(
            "CREATE TABLE \"{}\" ({});",
            self.table_name,
            column_defs.join(", ")
        ))
        .map_err(|e| PipelineError::Storage(format!("failed to create table: {e}")))?;

        let placeholders: Vec<String> =
            (1..=dataset.schema.columns.len()).map(|i| format!("?{i}")).collect();
        let insert_sql = format!(
            "INSERT INTO \"{}\" VALUES ({})",
            self.table_name,
            placeholders.join(", ")
        );

        {
            let mut stmt = tx
                .prepare(&insert_sql)
                .map_err(|e| PipelineError::Storage(format!("failed to prepare insert: {e}")))?;
            for row in &dataset.rows {
                let values: Vec<rusqlite::types::Value> = row
                    .iter()
                    .zip(&dataset.schema.columns)
                    .map(|(cell, column)| cell_to_sql(cell, column.column_type))
                    .collect();
                stmt.execute(rusqlite::params_from_iter(values))
                    .map_err(|e| PipelineError::Storage(format!("failed to insert row: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| PipelineError::Storage(format!("failed to commit load: {e}")))?;

        tracing::info!(
            table = %self.table_name,
            rows = dataset.rows.len(),
            "dataset materialized"
        );
        Ok(())
    }

    /// Execute an ad-hoc statement against the session table.
    ///
    /// Failures are returned as [`ExecFailure`] so the caller can feed the
    /// error text back to the model.
    pub fn execute(&self, sql: &str) -> std::result::Result<ResultSet, ExecFailure> {
        self.run(sql).map_err(|e| ExecFailure {
            sql: sql.to_string(),
            message: e.to_string(),
        })
    }

    fn run(&self, sql: &str) -> rusqlite::Result<ResultSet> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        let mut query = stmt.query([])?;
        while let Some(row) = query.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                cells.push(CellValue::from(row.get::<_, rusqlite::types::Value>(i)?));
            }
            rows.push(cells);
        }

        Ok(ResultSet { columns, rows })
    }
}

/// Convert a raw string cell into a typed SQL value per the inferred column
/// type. Empty cells become NULL.
fn cell_to_sql(cell: &str, column_type: ColumnType) -> rusqlite::types::Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return rusqlite::types::Value::Null;
    }
    match column_type {
        ColumnType::Integer => trimmed
            .parse::<i64>()
            .map(rusqlite::types::Value::Integer)
            .unwrap_or_else(|_| rusqlite::types::Value::Text(cell.to_string())),
        ColumnType::Real => trimmed
            .parse::<f64>()
            .map(rusqlite::types::Value::Real)
            .unwrap_or_else(|_| rusqlite::types::Value::Text(cell.to_string())),
        ColumnType::Text => rusqlite::types::Value::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn sample_dataset() -> Dataset {
        Dataset::from_csv_str("id,name,age\n1,Alice,30\n2,Bob,25\n3,Carol,41\n", "data")
            .unwrap()
    }

    #[test]
    fn test_load_and_query_round_trip() {
        let mut store = DatasetStore::open_in_memory("data").unwrap();
        store.load(&sample_dataset()).unwrap();

        let result = store.execute("SELECT id, name, age FROM data").unwrap();
        assert_eq!(result.columns, vec!["id", "name", "age"]);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.rows[0][1], CellValue::Text("Alice".to_string()));
        assert_eq!(result.rows[0][0], CellValue::Integer(1));
    }

    #[test]
    fn test_reload_replaces_previous_table() {
        let mut store = DatasetStore::open_in_memory("data").unwrap();
        store.load(&sample_dataset()).unwrap();

        let replacement = Dataset::from_csv_str("id,name\n9,Zoe\n", "data").unwrap();
        store.load(&replacement).unwrap();

        let result = store.execute("SELECT * FROM data").unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_execute_failure_carries_sql_and_error() {
        let mut store = DatasetStore::open_in_memory("data").unwrap();
        store.load(&sample_dataset()).unwrap();

        let failure = store.execute("SELECT nope FROM data").unwrap_err();
        assert_eq!(failure.sql, "SELECT nope FROM data");
        assert!(failure.message.contains("nope"));
    }

    #[test]
    fn test_rows_as_json() {
        let mut store = DatasetStore::open_in_memory("data").unwrap();
        store.load(&sample_dataset()).unwrap();

        let result = store
            .execute("SELECT name FROM data WHERE age > 26 ORDER BY age")
            .unwrap();
        let rows = result.rows_as_json();
        assert_eq!(rows, vec![
            serde_json::json!({"name": "Alice"}),
            serde_json::json!({"name": "Carol"}),
        ]);
    }

    #[test]
    fn test_empty_cells_stored_as_null() {
        let dataset = Dataset::from_csv_str("k,n\na,1\nb,\n", "data").unwrap();
        let mut store = DatasetStore::open_in_memory("data").unwrap();
        store.load(&dataset).unwrap();

        let result = store.execute("SELECT n FROM data ORDER BY k").unwrap();
        assert_eq!(result.rows[0][0], CellValue::Integer(1));
        assert_eq!(result.rows[1][0], CellValue::Null);
    }
}
