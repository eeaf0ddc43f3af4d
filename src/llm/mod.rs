//! Generation client.
//!
//! `ReadmeGenerator` is the seam between the pipeline and a concrete model
//! API; `GeminiClient` is the production implementation.

use crate::error::Result;
use async_trait::async_trait;

/// Gemini `generateContent` client
pub mod gemini;
mod types;

pub use gemini::{GeminiClient, EMPTY_RESPONSE_FALLBACK};

/// Produces README text from a complete prompt
#[async_trait]
pub trait ReadmeGenerator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Submits `prompt` as a single request and returns the generated text
    async fn generate(&self, prompt: &str) -> Result<String>;
}
