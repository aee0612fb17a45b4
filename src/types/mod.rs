//! Shared error and result types for the query pipeline.

use thiserror::Error;

/// Errors surfaced by the query pipeline.
///
/// Loader, model and extraction failures abort the current request
/// immediately. Per-query SQL execution failures feed the repair loop first
/// and only become `QueryExecution` once retries are exhausted.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Uploaded content could not be parsed as delimited tabular data.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The hosted model endpoint could not be reached or rejected the request.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The hosted model did not answer within the configured wait bound.
    #[error("model timed out: {0}")]
    ModelTimeout(String),

    /// Cleaning the model response did not leave a plausible SQL statement.
    #[error("no SQL statement found in model response: {0}")]
    NoSqlFound(String),

    /// The generated SQL kept failing after all attempts.
    #[error("query failed after {attempts} attempt(s): {error} (last SQL: {sql})")]
    QueryExecution {
        /// The last statement that was attempted.
        sql: String,
        /// The database error text from the last attempt.
        error: String,
        /// Total number of model calls made.
        attempts: usize,
    },

    /// Missing or invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Embedded store failure outside per-query execution.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
