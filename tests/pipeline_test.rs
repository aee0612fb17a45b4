//! End-to-end pipeline tests with a stubbed model client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use askql::{Dataset, ModelClient, PipelineError, QueryPipeline, QuerySession};

/// Stub model client: returns canned responses in order, repeating the last
/// one, and records every user prompt it receives. Clones share state so a
/// handle kept outside the pipeline can inspect calls afterwards.
#[derive(Clone)]
struct StubClient {
    inner: Arc<StubInner>,
}

struct StubInner {
    responses: Vec<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    fn new(responses: &[&str]) -> Self {
        Self {
            inner: Arc::new(StubInner {
                responses: responses.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }),
        }
    }

    fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.inner.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for StubClient {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> askql::Result<String> {
        let i = self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.prompts.lock().unwrap().push(user_prompt.to_string());
        let index = i.min(self.inner.responses.len() - 1);
        Ok(self.inner.responses[index].clone())
    }
}

/// A client that always fails, for error-propagation tests.
struct UnavailableClient;

#[async_trait]
impl ModelClient for UnavailableClient {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> askql::Result<String> {
        Err(PipelineError::ModelUnavailable("connection refused".to_string()))
    }
}

fn session() -> QuerySession {
    let dataset =
        Dataset::from_csv_str("id,name,age\n1,Alice,30\n2,Bob,25\n", "t").unwrap();
    QuerySession::new(&dataset).unwrap()
}

#[tokio::test]
async fn end_to_end_question_returns_matching_rows() {
    let client = StubClient::new(&["```sql\nSELECT name FROM t WHERE age > 26;\n```"]);
    let pipeline = QueryPipeline::new(client.clone(), 3);

    let outcome = pipeline
        .run(&session(), "who is older than 26?")
        .await
        .unwrap();

    assert_eq!(outcome.sql, "SELECT name FROM t WHERE age > 26;");
    assert_eq!(outcome.attempts, 1);
    assert_eq!(client.call_count(), 1);
    assert_eq!(
        outcome.result.rows_as_json(),
        vec![serde_json::json!({"name": "Alice"})]
    );
}

#[tokio::test]
async fn retry_bound_makes_exactly_max_attempts_model_calls() {
    let client = StubClient::new(&["SELECT nope FROM missing;"]);
    let pipeline = QueryPipeline::new(client.clone(), 3);

    let err = pipeline.run(&session(), "anything").await.unwrap_err();

    match err {
        PipelineError::QueryExecution { sql, attempts, .. } => {
            assert_eq!(attempts, 3);
            assert_eq!(sql, "SELECT nope FROM missing;");
        }
        other => panic!("expected QueryExecution, got {other:?}"),
    }
    assert_eq!(client.call_count(), 3);
}

#[tokio::test]
async fn repair_prompt_carries_failed_sql_and_error() {
    let client = StubClient::new(&[
        "SELECT nope FROM t;",
        "SELECT name FROM t WHERE age > 26;",
    ]);
    let pipeline = QueryPipeline::new(client.clone(), 3);

    let outcome = pipeline
        .run(&session(), "who is older than 26?")
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 2);
    assert_eq!(client.call_count(), 2);
    assert_eq!(
        outcome.result.rows_as_json(),
        vec![serde_json::json!({"name": "Alice"})]
    );

    let prompts = client.prompts();
    assert!(prompts[0].contains("who is older than 26?"));
    assert!(prompts[1].contains("SELECT nope FROM t;"));
    assert!(prompts[1].contains("nope"));
    assert!(prompts[1].contains("who is older than 26?"));
}

#[tokio::test]
async fn model_failure_aborts_without_retry() {
    let pipeline = QueryPipeline::new(UnavailableClient, 3);

    let err = pipeline.run(&session(), "anything").await.unwrap_err();
    assert!(matches!(err, PipelineError::ModelUnavailable(_)));
}

#[tokio::test]
async fn prose_response_is_no_sql_found() {
    let client = StubClient::new(&["I am not able to write SQL for that."]);
    let pipeline = QueryPipeline::new(client.clone(), 3);

    let err = pipeline.run(&session(), "anything").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoSqlFound(_)));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn single_attempt_pipeline_never_retries() {
    let client = StubClient::new(&["SELECT nope FROM missing;"]);
    let pipeline = QueryPipeline::new(client.clone(), 1);

    let err = pipeline.run(&session(), "anything").await.unwrap_err();
    assert!(matches!(err, PipelineError::QueryExecution { attempts: 1, .. }));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn malformed_upload_fails_before_any_model_call() {
    let err = Dataset::from_csv_str("a,b\n1,2\n3\n", "t").unwrap_err();
    assert!(matches!(err, PipelineError::MalformedInput(_)));
}

#[tokio::test]
async fn replace_swaps_the_whole_snapshot() {
    let mut session = session();
    let replacement = Dataset::from_csv_str("city\nParis\n", "t").unwrap();
    session.replace(&replacement).unwrap();

    let client = StubClient::new(&["SELECT city FROM t;"]);
    let pipeline = QueryPipeline::new(client, 3);
    let outcome = pipeline.run(&session, "list the cities").await.unwrap();

    assert_eq!(
        outcome.result.rows_as_json(),
        vec![serde_json::json!({"city": "Paris"})]
    );
}
