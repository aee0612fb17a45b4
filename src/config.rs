//! Pipeline configuration from the environment.

use std::time::Duration;

use crate::llm::Provider;
use crate::types::{PipelineError, Result};

/// Default model when `ASKQL_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default name of the session table.
pub const DEFAULT_TABLE_NAME: &str = "data";

/// Default and maximum number of model calls per question.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const MAX_ATTEMPTS_CEILING: usize = 3;

/// Default model request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the query pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Hosted model name.
    pub model: String,
    /// API key for the hosted endpoint. Never logged or echoed.
    pub api_key: String,
    /// Name of the table the dataset is materialized into.
    pub table_name: String,
    /// Model calls per question, bounded to 1..=3.
    pub max_attempts: usize,
    /// Model request timeout.
    pub timeout: Duration,
}

// Manual Debug keeps the API key out of logs.
impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("table_name", &self.table_name)
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a configuration with defaults for everything but model and key.
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Uses `ASKQL_MODEL` for the model (default: `gpt-4o-mini`). The API
    /// key comes from `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`, or
    /// `OPENAI_API_KEY` depending on the model name. `ASKQL_TABLE_NAME`,
    /// `ASKQL_MAX_ATTEMPTS`, and `ASKQL_TIMEOUT_SECS` override the defaults.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if the API key is not set.
    pub fn from_env() -> Result<Self> {
        let model =
            std::env::var("ASKQL_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let key_var = match Provider::for_model(&model) {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        };
        let api_key = std::env::var(key_var).map_err(|_| {
            PipelineError::Config(format!("{key_var} environment variable not set"))
        })?;

        let mut config = Self::new(model, api_key);

        if let Ok(table_name) = std::env::var("ASKQL_TABLE_NAME") {
            config.table_name = table_name;
        }
        if let Ok(raw) = std::env::var("ASKQL_MAX_ATTEMPTS") {
            let attempts: usize = raw.parse().map_err(|_| {
                PipelineError::Config(format!("invalid ASKQL_MAX_ATTEMPTS: {raw}"))
            })?;
            config.max_attempts = attempts.clamp(1, MAX_ATTEMPTS_CEILING);
        }
        if let Ok(raw) = std::env::var("ASKQL_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                PipelineError::Config(format!("invalid ASKQL_TIMEOUT_SECS: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("gpt-4o-mini".to_string(), "key".to_string());
        assert_eq!(config.table_name, "data");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = PipelineConfig::new("gpt-4o-mini".to_string(), "sk-secret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
