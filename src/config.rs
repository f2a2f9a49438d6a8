//! Configuration module for the indexing and query engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CI_` and use double underscores
//! to separate nested levels:
//! - `CI_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `CI_WORKER_POOL_SIZE=4` sets `worker_pool_size`
//! - `CI_INDEXING__INCLUDE_TESTS=false` sets `indexing.include_tests`

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StorageStrategy {
    /// Index databases live under `index_storage_root`, one directory per repo id.
    Centralized,
    /// Index database lives inside the workspace at `.indexes/`.
    InlineWorkspace,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root directory under which per-repository index databases are stored
    #[serde(default = "default_index_storage_root")]
    pub index_storage_root: PathBuf,

    /// Where the active index lives relative to a workspace
    #[serde(default = "default_storage_strategy")]
    pub storage_strategy: StorageStrategy,

    /// Memory budget for the extractor registry, in bytes
    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: u64,

    /// Language tags that should never be evicted from the extractor registry
    #[serde(default = "default_priority_languages")]
    pub priority_languages: Vec<String>,

    /// Debounce interval for the file watcher, in milliseconds
    #[serde(default = "default_watcher_debounce_ms")]
    pub watcher_debounce_ms: u64,

    /// Fixed worker pool size for incremental indexing
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Whether the semantic indexer is active
    #[serde(default = "default_false")]
    pub enable_semantic: bool,

    /// Embedding model identifier; required when `enable_semantic` is true
    #[serde(default)]
    pub embedding_model: Option<String>,

    /// Vector store endpoint; required when `enable_semantic` is true
    #[serde(default)]
    pub vector_store_endpoint: Option<String>,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Language-specific settings
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of parallel threads for indexing
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Patterns to ignore during indexing
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Include test files in the index
    #[serde(default = "default_true")]
    pub include_tests: bool,

    /// Include doc comments in the index
    #[serde(default = "default_false")]
    pub include_docs: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    /// Whether this language is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File extensions for this language
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Additional extractor options
    #[serde(default)]
    pub parser_options: HashMap<String, serde_json::Value>,
}

/// Logging verbosity, mirrored into a `tracing_subscriber::EnvFilter` string.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when no per-module override applies (e.g. "warn")
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `{"watcher": "debug"}`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_storage_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codeintel")
        .join("indexes")
}
fn default_storage_strategy() -> StorageStrategy {
    StorageStrategy::Centralized
}
fn default_max_memory_bytes() -> u64 {
    1024 * 1024 * 1024
}
fn default_priority_languages() -> Vec<String> {
    vec!["rust".to_string()]
}
fn default_watcher_debounce_ms() -> u64 {
    250
}
fn default_worker_pool_size() -> usize {
    num_cpus::get().min(8)
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_storage_root: default_index_storage_root(),
            storage_strategy: default_storage_strategy(),
            max_memory_bytes: default_max_memory_bytes(),
            priority_languages: default_priority_languages(),
            watcher_debounce_ms: default_watcher_debounce_ms(),
            worker_pool_size: default_worker_pool_size(),
            enable_semantic: false,
            embedding_model: None,
            vector_store_endpoint: None,
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                ".git/**".to_string(),
                "*.generated.*".to_string(),
            ],
            include_tests: true,
            include_docs: false,
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();

    langs.insert(
        "rust".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["rs".to_string()],
            parser_options: HashMap::new(),
        },
    );

    langs.insert(
        "python".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["py".to_string(), "pyi".to_string()],
            parser_options: HashMap::new(),
        },
    );

    langs.insert(
        "typescript".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec![
                "ts".to_string(),
                "tsx".to_string(),
                "js".to_string(),
                "jsx".to_string(),
            ],
            parser_options: HashMap::new(),
        },
    );

    langs.insert(
        "go".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["go".to_string()],
            parser_options: HashMap::new(),
        },
    );

    langs
}

impl Settings {
    /// Load configuration from all sources (defaults, workspace TOML, env vars).
    pub fn load() -> Result<Self, figment::Error> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".codeintel/settings.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("CI_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    /// Find the workspace root by looking for a `.codeintel` directory,
    /// searching from the current directory up to the filesystem root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".codeintel");
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Get the workspace root directory (where `.codeintel` is located).
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".codeintel");
            if config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Load configuration from a specific file, layered over defaults and env vars.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CI_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
