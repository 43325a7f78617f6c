//! Topic expansion and content generation pipeline
//!
//! Leaves first:
//! - `provenance`: display name → origin topic
//! - `list_parser`: best-effort list extraction from model output
//! - `text_generator` / `ollama_client`: upstream generation
//! - `generation_cache`: LRU memoization with single-flight loads
//! - `image_resolver` / `pixabay_client`: topic images
//! - `expansion`, `detail`, `annotation`: orchestrators
//! - `pipeline`: façade wiring everything together

pub mod annotation;
pub mod detail;
pub mod expansion;
pub mod generation_cache;
pub mod image_resolver;
pub mod list_parser;
pub mod ollama_client;
pub mod pipeline;
pub mod pixabay_client;
pub mod provenance;
pub mod text_generator;

pub use detail::{DetailOutcome, TopicDetail};
pub use expansion::Expansion;
pub use image_resolver::{ImageHit, ImageSearch, ImageSearchError};
pub use ollama_client::OllamaClient;
pub use pipeline::{KnowledgePipeline, PipelineOptions};
pub use pixabay_client::PixabayClient;
pub use provenance::ProvenanceTracker;
pub use text_generator::{GenerationBackend, GenerationError};

/// User-visible text when generation fails
pub const FALLBACK_TEXT: &str = "Error generating content";
