//! Node detail: title, article body and image pre-fetch
//!
//! Title and body are generated concurrently and joined. The image for the
//! node's origin topic is fetched by a detached task that is never joined;
//! its outcome does not affect the response.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::generation_cache::GenerationCache;
use super::image_resolver::ImageResolver;
use super::provenance::ProvenanceTracker;
use super::text_generator::OutputShape;
use super::FALLBACK_TEXT;

/// Body text of a degraded response
pub const DEGRADED_CONTENT: &str = "Content generation failed. Please try again.";

/// Titles shorter than this are replaced
const MIN_TITLE_CHARS: usize = 3;

/// Detail payload returned to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub title: String,
    pub content: String,
    pub original_topic: String,
}

impl TopicDetail {
    /// Placeholder used when orchestration itself fails
    pub fn degraded(node: &str) -> Self {
        Self {
            title: format!("About {}", node),
            content: DEGRADED_CONTENT.to_string(),
            original_topic: node.to_string(),
        }
    }
}

/// Detail plus whether it is the degraded placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailOutcome {
    pub detail: TopicDetail,
    pub degraded: bool,
}

/// Failures of the fan-out/join itself
#[derive(Debug, Error)]
pub enum DetailError {
    #[error("{0} task failed: {1}")]
    TaskFailed(&'static str, String),
}

pub fn title_prompt(node: &str) -> String {
    format!(
        "Generate a proper article title for '{}'.\n\
         Make it engaging but factual, like a Wikipedia article title.\n\
         Return only the title, no additional text.",
        node
    )
}

pub fn article_prompt(node: &str) -> String {
    format!(
        "Create a comprehensive article about '{}'.\n\
         Explain what it is, its background and history, its key concepts, and why it matters.\n\
         Write in clear, well-structured paragraphs.",
        node
    )
}

pub struct DetailOrchestrator {
    cache: Arc<GenerationCache>,
    provenance: Arc<ProvenanceTracker>,
    images: Arc<ImageResolver>,
    model: String,
}

impl DetailOrchestrator {
    pub fn new(
        cache: Arc<GenerationCache>,
        provenance: Arc<ProvenanceTracker>,
        images: Arc<ImageResolver>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            provenance,
            images,
            model: model.into(),
        }
    }

    pub async fn detail(&self, node: &str) -> DetailOutcome {
        match self.try_detail(node).await {
            Ok(detail) => DetailOutcome {
                detail,
                degraded: false,
            },
            Err(e) => {
                tracing::error!(node = %node, error = %e, "Detail orchestration failed");
                DetailOutcome {
                    detail: TopicDetail::degraded(node),
                    degraded: true,
                }
            }
        }
    }

    async fn try_detail(&self, node: &str) -> Result<TopicDetail, DetailError> {
        let original_topic = self.provenance.resolve(node);

        let title_task = self.spawn_generation(title_prompt(node));
        let content_task = self.spawn_generation(article_prompt(node));
        self.prefetch_image(original_topic.clone());

        let (title, content) = tokio::join!(title_task, content_task);
        let title = title.map_err(|e| DetailError::TaskFailed("title", e.to_string()))?;
        let content = content.map_err(|e| DetailError::TaskFailed("content", e.to_string()))?;

        let title = match title {
            Ok(title) if title.trim().chars().count() >= MIN_TITLE_CHARS => title.trim().to_string(),
            Ok(_) => format!("Understanding {}", node),
            Err(e) => {
                tracing::warn!(node = %node, error = %e, "Title generation failed");
                format!("Understanding {}", node)
            }
        };

        let content = content.unwrap_or_else(|e| {
            tracing::warn!(node = %node, error = %e, "Article generation failed");
            FALLBACK_TEXT.to_string()
        });

        Ok(TopicDetail {
            title,
            content,
            original_topic,
        })
    }

    fn spawn_generation(
        &self,
        prompt: String,
    ) -> tokio::task::JoinHandle<Result<String, super::GenerationError>> {
        let cache = Arc::clone(&self.cache);
        let model = self.model.clone();
        tokio::spawn(async move {
            cache
                .get_or_generate(&prompt, &model, OutputShape::Text)
                .await
        })
    }

    /// Warm the image cache; result intentionally dropped
    fn prefetch_image(&self, topic: String) {
        let images = Arc::clone(&self.images);
        tokio::spawn(async move {
            if images.resolve(&topic).await.is_none() {
                tracing::debug!(topic = %topic, "Image pre-fetch found nothing");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_detail() {
        let detail = TopicDetail::degraded("Black Holes");
        assert_eq!(detail.title, "About Black Holes");
        assert_eq!(detail.content, DEGRADED_CONTENT);
        assert_eq!(detail.original_topic, "Black Holes");
    }

    #[test]
    fn test_detail_serializes_camel_case() {
        let json = serde_json::to_value(TopicDetail::degraded("Stars")).unwrap();
        assert_eq!(json["originalTopic"], "Stars");
        assert!(json.get("original_topic").is_none());
    }
}
