//! CLI argument definitions for the Sift application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sift_core::config::SiftConfig;

/// Sift: on-device semantic search over session-partitioned text.
#[derive(Parser, Debug)]
#[command(name = "sift", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Vector store path, or ":memory:" for an ephemeral store.
    #[arg(long = "db", global = true)]
    pub db: Option<String>,

    /// Embedding model artifact.
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<PathBuf>,

    /// Embedding backend (onnx, tflite).
    #[arg(short = 'b', long = "backend", global = true)]
    pub backend: Option<String>,

    /// Inference thread count.
    #[arg(long = "threads", global = true)]
    pub threads: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed and store texts under a session; prints one id per line.
    Index {
        #[arg(short = 's', long = "session")]
        session: String,
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Rank a session's stored texts against a query; prints JSON.
    Query {
        #[arg(short = 's', long = "session")]
        session: String,
        /// Number of results (defaults to search.default_top_k).
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
        text: String,
    },
    /// Show store dimension, record counts, and sessions.
    Stats {
        #[arg(short = 's', long = "session")]
        session: Option<String>,
    },
    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SIFT_CONFIG env var > platform default (~/.sift/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SIFT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag and env var overrides on top of the file configuration.
    ///
    /// Store path: --db flag > SIFT_DB env var. Model: --model flag >
    /// SIFT_MODEL env var. Backend, threads and log level come from flags only.
    pub fn apply_overrides(&self, config: &mut SiftConfig) {
        if let Some(db) = self.db.clone().or_else(|| std::env::var("SIFT_DB").ok()) {
            config.storage.path = db;
        }
        if let Some(model) = self
            .model
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| std::env::var("SIFT_MODEL").ok())
        {
            config.embedding.model_path = model;
        }
        if let Some(ref backend) = self.backend {
            config.embedding.backend = backend.clone();
        }
        if self.threads.is_some() {
            config.embedding.num_threads = self.threads;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".sift").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".sift").join("config.toml");
    }
    PathBuf::from("config.toml")
}
