//! Prompt construction for SQL translation and repair.
//!
//! Pure functions of their inputs — no network, no clock, no randomness —
//! so the whole prompting layer is unit-testable offline.

use crate::dataset::TableSchema;

/// Fixed system prompt shared by translation and repair requests.
pub const SYSTEM_PROMPT: &str = "You are a SQL generator for SQLite. \
Translate the user's question into exactly one SQL statement over the described table. \
Return the SQL statement only: no markdown fences, no commentary.";

/// Render the initial translation prompt for a question.
pub fn translation_prompt(schema: &TableSchema, question: &str) -> String {
    format!(
        "Translate the following question into a single SQL statement over a table \
named '{}' with columns: {}. Return SQL only.\n\nQuestion: {}",
        schema.table_name,
        schema.describe(),
        question
    )
}

/// Render the follow-up prompt after a failed execution.
///
/// Carries the original question, the failed statement, and the database
/// error text so the model can correct itself.
pub fn repair_prompt(
    schema: &TableSchema,
    question: &str,
    failed_sql: &str,
    error: &str,
) -> String {
    format!(
        "The SQL statement below failed to execute. Return a corrected single SQL \
statement over the table named '{}' with columns: {}. Return SQL only.\n\n\
Question: {}\nFailed SQL: {}\nDatabase error: {}",
        schema.table_name,
        schema.describe(),
        question,
        failed_sql,
        error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn schema() -> TableSchema {
        Dataset::from_csv_str("id,name,age\n1,Alice,30\n", "data")
            .unwrap()
            .schema
    }

    #[test]
    fn test_translation_prompt_is_deterministic() {
        let schema = schema();
        let a = translation_prompt(&schema, "who is older than 26?");
        let b = translation_prompt(&schema, "who is older than 26?");
        assert_eq!(a, b);
    }

    #[test]
    fn test_translation_prompt_mentions_schema_and_question() {
        let prompt = translation_prompt(&schema(), "who is older than 26?");
        assert!(prompt.contains("'data'"));
        assert!(prompt.contains("id INTEGER, name TEXT, age INTEGER"));
        assert!(prompt.contains("who is older than 26?"));
    }

    #[test]
    fn test_repair_prompt_carries_failure_context() {
        let prompt = repair_prompt(
            &schema(),
            "who is older than 26?",
            "SELECT nope FROM data",
            "no such column: nope",
        );
        assert!(prompt.contains("SELECT nope FROM data"));
        assert!(prompt.contains("no such column: nope"));
        assert!(prompt.contains("who is older than 26?"));
    }
}
