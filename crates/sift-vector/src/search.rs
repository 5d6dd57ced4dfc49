//! Semantic search over a session-partitioned vector store.

use serde_json::Value;
use tracing::{debug, info};

use sift_core::config::SiftConfig;
use sift_core::error::Result;
use sift_storage::{Metadata, SearchResult, VectorStore};

use crate::embedding::{backend_from_config, EmbeddingBackend};
use crate::pipeline::EmbeddingPipeline;

/// Metadata key holding the original, un-normalized text of an indexed item.
pub const TEXT_KEY: &str = "text";

/// Coordinates the embedding pipeline and the vector store.
///
/// Generic over the backend so tests can keep a concrete `MockBackend`;
/// production code uses the boxed default chosen from configuration.
pub struct SearchEngine<B: EmbeddingBackend = Box<dyn EmbeddingBackend>> {
    pipeline: EmbeddingPipeline<B>,
    store: VectorStore,
}

impl SearchEngine {
    /// Build the backend and open the store described by `config`.
    pub fn from_config(config: &SiftConfig) -> Result<Self> {
        let backend = backend_from_config(&config.embedding)?;
        let store = VectorStore::from_config(&config.storage)?;
        info!(backend = backend.name(), "Search engine ready");
        Ok(Self::new(EmbeddingPipeline::new(backend), store))
    }
}

impl<B: EmbeddingBackend> SearchEngine<B> {
    pub fn new(pipeline: EmbeddingPipeline<B>, store: VectorStore) -> Self {
        Self { pipeline, store }
    }

    /// Embed and store `texts` under `session_id`, returning ids in input order.
    ///
    /// Each record carries `{"text": <original text>}` as metadata.
    pub fn index_texts<S: AsRef<str>>(
        &mut self,
        session_id: &str,
        texts: &[S],
    ) -> Result<Vec<String>> {
        let vectors = self.pipeline.embed_batch(texts)?;
        let metadatas: Vec<Option<Metadata>> = texts
            .iter()
            .map(|text| {
                let mut meta = Metadata::new();
                meta.insert(TEXT_KEY.to_string(), Value::String(text.as_ref().to_string()));
                Some(meta)
            })
            .collect();

        let ids = self.store.add_many(session_id, &vectors, &metadatas)?;
        info!(session_id, count = ids.len(), "Indexed texts");
        Ok(ids)
    }

    /// Rank the session's stored texts against `text`.
    pub fn query(
        &mut self,
        session_id: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query = self.pipeline.embed_text(text)?;
        let results = self.store.search(session_id, &query, top_k)?;
        debug!(session_id, top_k, returned = results.len(), "Query served");
        Ok(results)
    }

    /// Release the underlying store.
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn pipeline(&self) -> &EmbeddingPipeline<B> {
        &self.pipeline
    }
}
