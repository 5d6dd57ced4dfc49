use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SiftError};

/// Path value that selects an ephemeral, in-memory store.
pub const IN_MEMORY: &str = ":memory:";

/// Top-level configuration for Sift.
///
/// Loaded from `~/.sift/config.toml` by default. Every section is optional in
/// the file; missing keys fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiftConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl SiftConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SiftConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check values that serde alone cannot reject.
    pub fn validate(&self) -> Result<()> {
        self.embedding.backend_kind()?;
        if self.embedding.num_threads == Some(0) {
            return Err(SiftError::Config(
                "embedding.num_threads must be at least 1".to_string(),
            ));
        }
        if self.storage.dimension == Some(0) {
            return Err(SiftError::Config(
                "storage.dimension must be at least 1".to_string(),
            ));
        }
        if self.search.default_top_k == 0 {
            return Err(SiftError::Config(
                "search.default_top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Embedding backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Runtime variant: "onnx", "tflite" or "tensorflow-lite".
    pub backend: String,
    /// Path to the model artifact.
    pub model_path: String,
    /// Intra-op thread count handed to the runtime. Runtime default when unset.
    pub num_threads: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "onnx".to_string(),
            model_path: "~/.sift/models/embedding.onnx".to_string(),
            num_threads: None,
        }
    }
}

impl EmbeddingConfig {
    /// Parse the configured backend name.
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend.parse()
    }

    /// Model path with a leading `~` expanded.
    pub fn resolved_model_path(&self) -> PathBuf {
        expand_home(&self.model_path)
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path, or `":memory:"` for an ephemeral store.
    pub path: String,
    /// Explicit vector dimension. Fixed by the first vector when unset.
    pub dimension: Option<usize>,
    /// Create a partial index per session on first write to that session.
    pub per_session_indexes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "~/.sift/data/vectors.db".to_string(),
            dimension: None,
            per_session_indexes: true,
        }
    }
}

impl StorageConfig {
    pub fn location(&self) -> StoreLocation {
        StoreLocation::parse(&self.path)
    }
}

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of results returned when the caller does not ask for a count.
    pub default_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

/// The fixed set of inference runtimes an embedding backend can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// ONNX Runtime; the whole batch goes through one inference call.
    Onnx,
    /// TensorFlow Lite; one interpreter invocation per text.
    Tflite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Onnx => "onnx",
            BackendKind::Tflite => "tflite",
        }
    }
}

impl FromStr for BackendKind {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(BackendKind::Onnx),
            "tflite" | "tensorflow-lite" => Ok(BackendKind::Tflite),
            _ => Err(SiftError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a vector store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Ephemeral; everything is gone once the store is closed.
    InMemory,
    /// Durable SQLite file.
    Path(PathBuf),
}

impl StoreLocation {
    /// `":memory:"` (or an empty string) selects an in-memory store; anything
    /// else is a file path, with a leading `~` expanded.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == IN_MEMORY {
            StoreLocation::InMemory
        } else {
            StoreLocation::Path(expand_home(trimmed))
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::InMemory => f.write_str(IN_MEMORY),
            StoreLocation::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return PathBuf::from(path),
    };
    match home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
