//! Sift application binary - composition root.
//!
//! Ties the Sift crates into a single executable:
//! 1. Load configuration from TOML, then apply env var and flag overrides
//! 2. Initialize tracing
//! 3. Build the embedding backend and open the vector store
//! 4. Run one subcommand (index, query, stats, init-config)

mod cli;

use std::path::Path;

use clap::Parser;
use serde_json::json;

use sift_core::config::SiftConfig;
use sift_core::error::SiftError;
use sift_storage::VectorStore;
use sift_vector::SearchEngine;

use cli::{CliArgs, Command};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = if config_file.exists() {
        SiftConfig::load(&config_file)?
    } else {
        SiftConfig::default()
    };
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::debug!(path = %config_file.display(), "Configuration resolved");

    match args.command {
        Command::InitConfig { force } => init_config(&config_file, force)?,
        Command::Index { session, texts } => {
            config.validate()?;
            let mut engine = SearchEngine::from_config(&config)?;
            let ids = engine.index_texts(&session, texts.as_slice())?;
            engine.close()?;
            for id in ids {
                println!("{}", id);
            }
        }
        Command::Query {
            session,
            top_k,
            text,
        } => {
            config.validate()?;
            let top_k = top_k.unwrap_or(config.search.default_top_k);
            let mut engine = SearchEngine::from_config(&config)?;
            let results = engine.query(&session, &text, top_k)?;
            engine.close()?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Stats { session } => {
            let stats = stats_report(&config, session.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Summarize the configured store, optionally for one session.
fn stats_report(
    config: &SiftConfig,
    session: Option<&str>,
) -> Result<serde_json::Value, SiftError> {
    config.validate()?;
    let store = VectorStore::from_config(&config.storage)?;
    let stats = json!({
        "location": config.storage.location().to_string(),
        "dimension": store.dimension(),
        "count": store.count(session)?,
        "sessions": store.sessions()?,
    });
    store.close()?;
    Ok(stats)
}

/// Write the default configuration unless a file already exists.
fn init_config(path: &Path, force: bool) -> Result<(), SiftError> {
    if path.exists() && !force {
        return Err(SiftError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    SiftConfig::default().save(path)?;
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> SiftConfig {
        let mut config = SiftConfig::default();
        config.storage.path = ":memory:".to_string();
        config
    }

    #[test]
    fn test_stats_on_empty_store() {
        let stats = stats_report(&memory_config(), None).unwrap();
        assert_eq!(stats["count"], 0);
        assert!(stats["dimension"].is_null());
        assert_eq!(stats["sessions"], json!([]));
    }

    #[test]
    fn test_stats_rejects_invalid_config() {
        let mut config = memory_config();
        config.storage.dimension = Some(0);
        assert!(matches!(
            stats_report(&config, None),
            Err(SiftError::Config(_))
        ));

        let mut config = memory_config();
        config.embedding.backend = "pytorch".to_string();
        assert!(stats_report(&config, Some("s1")).is_err());
    }
}
