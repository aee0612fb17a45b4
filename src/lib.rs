//! askql — query CSV datasets in plain English.
//!
//! A CSV upload becomes an in-memory SQLite table; a hosted LLM translates
//! the user's question into a single SQL statement; the statement is cleaned
//! with an ordered list of text-normalization rules, executed, and — when
//! execution fails — repaired by re-prompting the model with the database
//! error, bounded by a retry limit.
//!
//! # Example
//!
//! ```no_run
//! use askql::{Dataset, HttpModelClient, PipelineConfig, QueryPipeline, QuerySession};
//!
//! # async fn example() -> askql::Result<()> {
//! let config = PipelineConfig::from_env()?;
//! let dataset = Dataset::from_csv_path("people.csv", &config.table_name)?;
//! let session = QuerySession::new(&dataset)?;
//!
//! let client = HttpModelClient::from_config(&config)?;
//! let pipeline = QueryPipeline::new(client, config.max_attempts);
//!
//! let outcome = pipeline.run(&session, "who is older than 26?").await?;
//! println!("{}", outcome.sql);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dataset;
pub mod llm;
pub mod pipeline;
pub mod store;
pub mod types;

pub use config::PipelineConfig;
pub use dataset::{Column, ColumnType, Dataset, TableSchema};
pub use llm::{HttpModelClient, ModelClient};
pub use pipeline::{QueryOutcome, QueryPipeline, QuerySession, QueryState};
pub use store::{CellValue, DatasetStore, ResultSet};
pub use types::{PipelineError, Result};
