//! Node expansion: five child topics per clicked node
//!
//! Each call moves `Idle → Generating → Done` exactly once; retries are left
//! to the layers below. Every parsed child is recorded in the provenance
//! tracker against the clicked node.

use serde::Serialize;
use std::sync::Arc;

use super::generation_cache::GenerationCache;
use super::list_parser::parse_topic_list;
use super::provenance::ProvenanceTracker;
use super::text_generator::OutputShape;
use super::FALLBACK_TEXT;

/// Result of expanding a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion {
    /// Literal-list text handed to the tree UI (or the fallback text)
    pub raw: String,
    /// Parsed child topics, at most five
    pub topics: Vec<String>,
}

/// Expansion prompt for `node`
pub fn expansion_prompt(node: &str) -> String {
    format!(
        "Generate exactly 5 short, specific topics related to '{}'.\n\
         Format as a Python list of strings.\n\
         Example format: ['Topic 1', 'Topic 2', 'Topic 3', 'Topic 4', 'Topic 5']\n\
         Keep topics concise and relevant.",
        node
    )
}

pub struct ExpansionOrchestrator {
    cache: Arc<GenerationCache>,
    provenance: Arc<ProvenanceTracker>,
    model: String,
}

impl ExpansionOrchestrator {
    pub fn new(
        cache: Arc<GenerationCache>,
        provenance: Arc<ProvenanceTracker>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            provenance,
            model: model.into(),
        }
    }

    pub async fn expand(&self, node: &str) -> Expansion {
        tracing::debug!(node = %node, "Expansion generating");

        let raw = match self
            .cache
            .get_or_generate(&expansion_prompt(node), &self.model, OutputShape::List)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(node = %node, error = %e, "Topic generation failed");
                return Expansion {
                    raw: FALLBACK_TEXT.to_string(),
                    topics: Vec::new(),
                };
            }
        };

        let topics = match parse_topic_list(&raw) {
            Some(parsed) => parsed.items,
            None => {
                tracing::warn!(node = %node, "Could not parse topics for provenance tracking");
                Vec::new()
            }
        };

        for topic in &topics {
            self.provenance.record(topic.clone(), node);
        }

        tracing::info!(node = %node, children = topics.len(), "Expansion done");
        Expansion { raw, topics }
    }
}
