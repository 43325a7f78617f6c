//! Configuration loading and root folder resolution
//!
//! Resolution order for every setting is:
//! 1. Command-line argument (highest priority, where one exists)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is never fatal: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the service configuration inside the platform config dir
pub const CONFIG_FILE_NAME: &str = "kweb-server.toml";

/// SQLite database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "knowledge_web.db";

/// Image cache directory name inside the root folder
pub const IMAGES_DIR_NAME: &str = "topic_images";

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "KWEB_CONFIG";
/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "KWEB_ROOT_FOLDER";
/// Environment variable overriding the generation endpoint
pub const ENV_OLLAMA_URL: &str = "KWEB_OLLAMA_URL";
/// Environment variable overriding the generation model
pub const ENV_MODEL: &str = "KWEB_MODEL";
/// Environment variable carrying the image-search API key
pub const ENV_PIXABAY_API_KEY: &str = "KWEB_PIXABAY_API_KEY";
/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "KWEB_PORT";

/// Top-level TOML configuration
///
/// Every section has defaults, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the database and image cache
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub image_search: ImageSearchConfig,
    pub cache: CacheConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
        }
    }
}

/// Text-generation service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Streaming generate endpoint (Ollama-compatible)
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of generation requests in flight at once
    pub max_concurrent: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "llama3.1".to_string(),
            timeout_secs: 120,
            max_concurrent: 4,
        }
    }
}

/// Image-search service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSearchConfig {
    /// Search endpoint (Pixabay-compatible)
    pub endpoint: String,
    /// API key; image search is disabled when absent
    pub api_key: Option<String>,
    pub per_page: u32,
    pub min_width: u32,
    pub min_height: u32,
    /// Per-request timeout in seconds (search and download)
    pub timeout_secs: u64,
}

impl Default for ImageSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://pixabay.com/api/".to_string(),
            api_key: None,
            per_page: 3,
            min_width: 800,
            min_height: 600,
            timeout_secs: 30,
        }
    }
}

/// Generation cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached generations
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl TomlConfig {
    /// Apply environment variable overrides on top of file values
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(ENV_OLLAMA_URL) {
            info!("Generation endpoint overridden by {}", ENV_OLLAMA_URL);
            self.generation.endpoint = url;
        }

        if let Some(model) = non_empty_env(ENV_MODEL) {
            info!("Generation model overridden by {}", ENV_MODEL);
            self.generation.model = model;
        }

        if let Some(key) = non_empty_env(ENV_PIXABAY_API_KEY) {
            info!("Image search API key loaded from environment variable");
            self.image_search.api_key = Some(key);
        }

        if let Some(port) = non_empty_env(ENV_PORT) {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_PORT, port),
            }
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Default config file location for the platform
///
/// `<config_dir>/kweb/kweb-server.toml`, or the working directory when the
/// platform has no config dir.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("kweb").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Pick the config file: CLI argument, then `KWEB_CONFIG`, then default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = non_empty_env(ENV_CONFIG) {
        return PathBuf::from(path);
    }

    default_config_path()
}

/// Load TOML configuration
///
/// **Behavior:**
/// - File missing → warning, compiled defaults
/// - File unreadable or malformed → `Error::Config`
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}; using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("kweb"))
        .unwrap_or_else(|| PathBuf::from("./kweb_data"))
}

/// Root folder resolver
///
/// Priority: CLI argument → `KWEB_ROOT_FOLDER` → TOML `root_folder` →
/// OS default.
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_root: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_root }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Some(path) = non_empty_env(ENV_ROOT_FOLDER) {
            return PathBuf::from(path);
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and names the files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder and image cache directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.images_path())?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn images_path(&self) -> PathBuf {
        self.root_folder.join(IMAGES_DIR_NAME)
    }
}
