//! Topic pipeline façade
//!
//! Owns the process-wide state (provenance map, generation cache) and the
//! orchestrators built on it. Everything is injected at construction so
//! tests can swap the external services for stubs.

use kweb_common::config::TomlConfig;
use std::path::PathBuf;
use std::sync::Arc;

use super::annotation::Annotator;
use super::detail::{DetailOrchestrator, DetailOutcome};
use super::expansion::{Expansion, ExpansionOrchestrator};
use super::generation_cache::{GenerationCache, DEFAULT_CACHE_CAPACITY};
use super::image_resolver::{ImageResolver, ImageSearch};
use super::provenance::ProvenanceTracker;
use super::text_generator::{GenerationBackend, TextGenerator};

/// Construction parameters for [`KnowledgePipeline`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Model identifier for every generation call
    pub model: String,
    /// Generation cache capacity (entries)
    pub cache_capacity: u64,
    /// Upper bound on concurrent upstream generation calls
    pub max_concurrent_generations: usize,
    /// Image cache directory
    pub images_dir: PathBuf,
}

impl PipelineOptions {
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: "llama3.1".to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_concurrent_generations: 4,
            images_dir: images_dir.into(),
        }
    }

    pub fn from_config(config: &TomlConfig, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: config.generation.model.clone(),
            cache_capacity: config.cache.capacity,
            max_concurrent_generations: config.generation.max_concurrent,
            images_dir: images_dir.into(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Inbound operations of the topic pipeline
pub struct KnowledgePipeline {
    provenance: Arc<ProvenanceTracker>,
    generator: Arc<TextGenerator>,
    cache: Arc<GenerationCache>,
    images: Arc<ImageResolver>,
    expansion: ExpansionOrchestrator,
    detail: DetailOrchestrator,
    annotator: Annotator,
}

impl KnowledgePipeline {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        search: Arc<dyn ImageSearch>,
        options: PipelineOptions,
    ) -> Self {
        let provenance = Arc::new(ProvenanceTracker::new());
        let generator = Arc::new(TextGenerator::new(backend, options.max_concurrent_generations));
        let cache = Arc::new(GenerationCache::new(
            Arc::clone(&generator),
            options.cache_capacity,
        ));
        let images = Arc::new(ImageResolver::new(options.images_dir, search));

        let expansion = ExpansionOrchestrator::new(
            Arc::clone(&cache),
            Arc::clone(&provenance),
            options.model.clone(),
        );
        let detail = DetailOrchestrator::new(
            Arc::clone(&cache),
            Arc::clone(&provenance),
            Arc::clone(&images),
            options.model.clone(),
        );
        let annotator = Annotator::new(Arc::clone(&cache), options.model);

        Self {
            provenance,
            generator,
            cache,
            images,
            expansion,
            detail,
            annotator,
        }
    }

    /// Five child topics for `node`
    pub async fn expand(&self, node: &str) -> Expansion {
        self.expansion.expand(node).await
    }

    /// Title, article and origin topic for `node`
    pub async fn detail(&self, node: &str) -> DetailOutcome {
        self.detail.detail(node).await
    }

    /// Image for a display name, looked up under its origin topic
    pub async fn resolve_image(&self, name: &str) -> Option<PathBuf> {
        let origin = self.provenance.resolve(name);
        tracing::debug!(name = %name, origin = %origin, "Resolving topic image");
        self.images.resolve(&origin).await
    }

    /// Short explanation of `selected_text` in the context of `topic`
    pub async fn annotate(&self, selected_text: &str, topic: &str) -> String {
        self.annotator.annotate(selected_text, topic).await
    }

    pub fn reset_provenance(&self) {
        self.provenance.clear();
    }

    /// Stop issuing generation calls; cached results are still served
    pub fn shutdown(&self) {
        self.generator.close();
        tracing::info!("Topic pipeline stopped accepting generation calls");
    }

    pub fn provenance(&self) -> &ProvenanceTracker {
        &self.provenance
    }

    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    pub fn images(&self) -> &ImageResolver {
        &self.images
    }
}
