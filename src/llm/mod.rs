//! LLM integration: prompt construction, hosted model client, SQL extraction.

pub mod client;
pub mod extract;
pub mod prompt;

pub use client::{HttpModelClient, ModelClient, Provider};
pub use extract::extract;
pub use prompt::{repair_prompt, translation_prompt, SYSTEM_PROMPT};
