//! Short explanations of selected article text

use std::sync::Arc;

use super::generation_cache::GenerationCache;
use super::text_generator::OutputShape;

/// Returned when no explanation could be generated
pub const ANNOTATION_FALLBACK: &str = "Failed to generate explanation. Please try again.";

pub fn annotation_prompt(selected_text: &str, topic: &str) -> String {
    format!(
        "Provide a brief, focused explanation of this excerpt in the context of {}:\n\
         \"{}\"\n\
         \n\
         Rules:\n\
         - Keep the explanation to 1-2 short sentences\n\
         - Focus on the key insight or main point\n\
         - Use simple, clear language\n\
         - Maximum 50 words\n\
         \n\
         Explain it as if summarizing for a quick note.",
        topic, selected_text
    )
}

pub struct Annotator {
    cache: Arc<GenerationCache>,
    model: String,
}

impl Annotator {
    pub fn new(cache: Arc<GenerationCache>, model: impl Into<String>) -> Self {
        Self {
            cache,
            model: model.into(),
        }
    }

    pub async fn annotate(&self, selected_text: &str, topic: &str) -> String {
        tracing::debug!(topic = %topic, chars = selected_text.len(), "Generating annotation");

        match self
            .cache
            .get_or_generate(
                &annotation_prompt(selected_text, topic),
                &self.model,
                OutputShape::Text,
            )
            .await
        {
            Ok(explanation) => explanation,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Annotation generation failed");
                ANNOTATION_FALLBACK.to_string()
            }
        }
    }
}
