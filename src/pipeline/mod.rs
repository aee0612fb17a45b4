//! The bounded translate-execute-repair loop around the hosted model.
//!
//! One query moves through `Submitted → Prompting → AwaitingModel →
//! Extracting → Executing`, ending in `Succeeded` or `Failed`; an execution
//! failure transitions to `Retrying` and back to `Prompting` while attempts
//! remain. Loader, model, and extraction errors abort immediately — only
//! execution failures are retried, with the database error fed back into the
//! repair prompt.

use tracing::{debug, warn};

use crate::dataset::{Dataset, TableSchema};
use crate::llm::{extract, prompt, ModelClient};
use crate::store::{DatasetStore, ExecFailure, ResultSet};
use crate::types::{PipelineError, Result};

/// States of one query through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Submitted,
    Prompting,
    AwaitingModel,
    Extracting,
    Executing,
    Retrying,
    Succeeded,
    Failed,
}

/// Session-scoped context: the materialized dataset and its schema.
///
/// An explicit value rather than ambient global state, so independent
/// sessions can coexist. Replacing the dataset swaps the whole snapshot.
pub struct QuerySession {
    store: DatasetStore,
    schema: TableSchema,
}

impl QuerySession {
    /// Materialize a dataset into a fresh in-memory store.
    pub fn new(dataset: &Dataset) -> Result<Self> {
        let mut store = DatasetStore::open_in_memory(&dataset.schema.table_name)?;
        store.load(dataset)?;
        Ok(Self {
            store,
            schema: dataset.schema.clone(),
        })
    }

    /// Replace the active dataset with a new upload.
    pub fn replace(&mut self, dataset: &Dataset) -> Result<()> {
        let mut store = DatasetStore::open_in_memory(&dataset.schema.table_name)?;
        store.load(dataset)?;
        self.store = store;
        self.schema = dataset.schema.clone();
        Ok(())
    }

    /// Schema of the active dataset.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The embedded store holding the active dataset.
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }
}

/// Outcome of a successful query.
#[derive(Debug)]
pub struct QueryOutcome {
    /// The cleaned statement that produced the result.
    pub sql: String,
    /// Result rows in execution order.
    pub result: ResultSet,
    /// Number of model calls it took.
    pub attempts: usize,
}

/// Bounded translate-execute-repair pipeline.
pub struct QueryPipeline<C> {
    client: C,
    max_attempts: usize,
}

impl<C: ModelClient> QueryPipeline<C> {
    /// Create a pipeline. `max_attempts` is the total model-call bound per
    /// question (minimum 1).
    pub fn new(client: C, max_attempts: usize) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run one natural-language question against the session dataset.
    ///
    /// # Errors
    ///
    /// - `ModelUnavailable` / `ModelTimeout`: the hosted endpoint failed —
    ///   surfaced immediately, no retry.
    /// - `NoSqlFound`: cleaning could not isolate a statement.
    /// - `QueryExecution`: every attempt executed and failed; carries the
    ///   last SQL and error text.
    pub async fn run(&self, session: &QuerySession, question: &str) -> Result<QueryOutcome> {
        let schema = session.schema();
        let mut state = QueryState::Submitted;
        debug!(?state, question, "query submitted");

        let mut last_failure: Option<ExecFailure> = None;

        for attempt in 1..=self.max_attempts {
            state = QueryState::Prompting;
            debug!(?state, attempt);
            let user_prompt = match &last_failure {
                None => prompt::translation_prompt(schema, question),
                Some(failure) => {
                    prompt::repair_prompt(schema, question, &failure.sql, &failure.message)
                }
            };

            state = QueryState::AwaitingModel;
            debug!(?state, attempt);
            let raw = self
                .client
                .complete(prompt::SYSTEM_PROMPT, &user_prompt)
                .await?;

            state = QueryState::Extracting;
            debug!(?state, attempt);
            let sql = extract::extract(&raw)?;

            state = QueryState::Executing;
            debug!(?state, attempt, sql = %sql);
            match session.store().execute(&sql) {
                Ok(result) => {
                    state = QueryState::Succeeded;
                    debug!(?state, attempt, rows = result.row_count());
                    return Ok(QueryOutcome {
                        sql,
                        result,
                        attempts: attempt,
                    });
                }
                Err(failure) => {
                    warn!(
                        attempt,
                        sql = %failure.sql,
                        error = %failure.message,
                        "generated SQL failed to execute"
                    );
                    if attempt < self.max_attempts {
                        state = QueryState::Retrying;
                        debug!(?state, attempt);
                    }
                    last_failure = Some(failure);
                }
            }
        }

        state = QueryState::Failed;
        debug!(?state, attempts = self.max_attempts);
        let failure = last_failure.unwrap_or_else(|| ExecFailure {
            sql: String::new(),
            message: "no attempts were made".to_string(),
        });
        Err(PipelineError::QueryExecution {
            sql: failure.sql,
            error: failure.message,
            attempts: self.max_attempts,
        })
    }
}
