//! Configuration file support
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/vqs/config.toml` (user defaults)
//! 2. `vqs.toml` in the working directory (project overrides)
//! 3. Environment variables (`VQS_DATA_DIR`, `VQS_DATABASE_PATH`,
//!    `VQS_BIND`, `VQS_PORT`, `COHERE_API_KEY`, `COHERE_MODEL`)
//!
//! CLI flags override all config file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Embedding provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API key; without it chunk creation requires a caller-supplied
    /// embedding.
    pub api_key: Option<String>,
    pub model: String,
    pub input_type: String,
    pub endpoint: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "embed-english-v3.0".into(),
            input_type: "search_document".into(),
            endpoint: "https://api.cohere.com/v1/embed".into(),
        }
    }
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding vector files, index blobs, and the database.
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub bind: String,
    pub port: u16,
    pub embedding: EmbeddingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        let database_path = data_dir.join("vqs.db");
        Self {
            data_dir,
            database_path,
            bind: "127.0.0.1".into(),
            port: 8000,
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Partial config as it appears in a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    bind: Option<String>,
    port: Option<u16>,
    embedding: Option<EmbeddingConfig>,
}

impl Config {
    /// Load configuration from user and project config files plus the
    /// environment.
    pub fn load(project_root: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_path) = dirs::config_dir().map(|d| d.join("vqs/config.toml")) {
            if let Some(file) = Self::load_file(&user_path) {
                config.apply_file(file);
            }
        }
        if let Some(file) = Self::load_file(&project_root.join("vqs.toml")) {
            config.apply_file(file);
        }
        config.apply_env();

        tracing::debug!(
            data_dir = %config.data_dir.display(),
            bind = %config.bind,
            port = config.port,
            "Configuration resolved"
        );
        config
    }

    fn load_file(path: &Path) -> Option<FileConfig> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config file");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring invalid config file: {e}");
                None
            }
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(data_dir) = file.data_dir {
            // database_path follows data_dir unless set explicitly
            self.database_path = data_dir.join("vqs.db");
            self.data_dir = data_dir;
        }
        if let Some(database_path) = file.database_path {
            self.database_path = database_path;
        }
        if let Some(bind) = file.bind {
            self.bind = bind;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("VQS_DATA_DIR") {
            self.database_path = PathBuf::from(&v).join("vqs.db");
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VQS_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VQS_BIND") {
            self.bind = v;
        }
        if let Ok(v) = std::env::var("VQS_PORT") {
            match v.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid VQS_PORT: {v}"),
            }
        }
        if let Ok(v) = std::env::var("COHERE_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("COHERE_MODEL") {
            self.embedding.model = v;
        }
    }
}
