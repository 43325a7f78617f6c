//! Configuration resolution for kweb-server
//!
//! **Priority:** ENV → TOML → compiled defaults
//!
//! Also wires the resolved settings into the production pipeline (Ollama
//! generation, Pixabay image search).

use kweb_common::config::{load_toml_config, TomlConfig};
use kweb_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::{KnowledgePipeline, OllamaClient, PipelineOptions, PixabayClient};

/// Load the TOML file, apply environment overrides and validate
pub fn load_service_config(config_path: &Path) -> Result<TomlConfig> {
    let mut config = load_toml_config(config_path)?;
    config.apply_env_overrides();
    validate(&config)?;
    Ok(config)
}

/// Reject settings the pipeline cannot run with
pub fn validate(config: &TomlConfig) -> Result<()> {
    if config.generation.endpoint.trim().is_empty() {
        return Err(Error::Config("generation.endpoint must not be empty".to_string()));
    }

    if config.generation.model.trim().is_empty() {
        return Err(Error::Config("generation.model must not be empty".to_string()));
    }

    if config.cache.capacity == 0 {
        return Err(Error::Config("cache.capacity must be at least 1".to_string()));
    }

    if config.generation.max_concurrent == 0 {
        warn!("generation.max_concurrent = 0; using 1");
    }

    Ok(())
}

/// Build the pipeline against the configured external services
pub fn build_pipeline(config: &TomlConfig, images_dir: PathBuf) -> Result<KnowledgePipeline> {
    let backend = OllamaClient::from_config(&config.generation)
        .map_err(|e| Error::Config(format!("Generation client setup failed: {}", e)))?;
    let search = PixabayClient::from_config(&config.image_search)
        .map_err(|e| Error::Config(format!("Image search client setup failed: {}", e)))?;

    info!(
        endpoint = %backend.endpoint(),
        model = %config.generation.model,
        cache_capacity = config.cache.capacity,
        images_dir = %images_dir.display(),
        "Topic pipeline configured"
    );

    Ok(KnowledgePipeline::new(
        Arc::new(backend),
        Arc::new(search),
        PipelineOptions::from_config(config, images_dir),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&TomlConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = TomlConfig::default();
        config.cache.capacity = 0;
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = TomlConfig::default();
        config.generation.model = "  ".to_string();
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_build_pipeline_from_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = build_pipeline(&TomlConfig::default(), dir.path().to_path_buf()).unwrap();
        assert_eq!(pipeline.images().images_dir(), dir.path());
        assert!(pipeline.provenance().is_empty());
    }
}
