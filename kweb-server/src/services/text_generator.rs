//! Text generation with shape-dependent post-processing
//!
//! [`TextGenerator`] sits between the cache and the external service:
//! - appends the response-format instruction to every prompt
//! - bounds the number of upstream calls in flight
//! - cleans the output, turning list requests into a canonical literal list
//!
//! Failures stay typed ([`GenerationError`]) until an orchestrator converts
//! them to the user-visible fallback text.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use super::list_parser::{parse_topic_list, render_list};

/// Instruction appended to every prompt sent upstream
pub const RESPONSE_INSTRUCTION: &str =
    "Provide only the requested information without any additional text or formatting.";

/// Text-generation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation request timed out")]
    Timeout,

    #[error("Generation service returned status {0}")]
    Status(u16),

    #[error("Generation service returned no content")]
    EmptyResponse,

    #[error("Generation service shutting down")]
    Unavailable,
}

/// External text-generation service
///
/// Implementations return the raw reassembled text; cleaning happens in
/// [`TextGenerator`].
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, GenerationError>;
}

/// Output shape a caller expects from a prompt
///
/// Declared by the caller, never inferred from prompt text: node names and
/// selected text are user input and may contain any words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputShape {
    /// Normalized to a literal list of at most five items
    List,
    /// Free text, returned trimmed
    Text,
}

/// Bounded, post-processing wrapper around a [`GenerationBackend`]
pub struct TextGenerator {
    backend: Arc<dyn GenerationBackend>,
    permits: Semaphore,
}

impl TextGenerator {
    /// `max_concurrent` is clamped to at least one
    pub fn new(backend: Arc<dyn GenerationBackend>, max_concurrent: usize) -> Self {
        Self {
            backend,
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Refuse new upstream calls; waiting and later calls get `Unavailable`
    pub fn close(&self) {
        self.permits.close();
    }

    /// Generate text for `prompt` with `model`, cleaned for `shape`
    ///
    /// **Errors:** upstream failures, or empty output after cleaning
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        shape: OutputShape,
    ) -> Result<String, GenerationError> {
        let raw = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| GenerationError::Unavailable)?;

            let full_prompt = format!("{}\n{}", prompt, RESPONSE_INSTRUCTION);
            self.backend.complete(&full_prompt, model).await?
        };

        let text = post_process(shape, &raw)?;
        tracing::debug!(model = %model, chars = text.len(), "Generation complete");
        Ok(text)
    }
}

/// Clean raw generation output for the requested shape
pub fn post_process(shape: OutputShape, raw: &str) -> Result<String, GenerationError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    match shape {
        OutputShape::Text => Ok(cleaned.to_string()),
        OutputShape::List => {
            let parsed = parse_topic_list(cleaned).ok_or(GenerationError::EmptyResponse)?;
            tracing::debug!(strategy = ?parsed.strategy, items = parsed.items.len(), "Parsed list output");
            Ok(render_list(&parsed.items))
        }
    }
}
