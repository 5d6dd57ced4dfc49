//! Text-to-vector pipeline.
//!
//! The EmbeddingPipeline normalizes every input, in order, and hands the
//! batch to its backend. It is the only path from raw text to a vector.

use tracing::debug;

use sift_core::error::{Result, SiftError};

use crate::embedding::EmbeddingBackend;
use crate::normalize::normalize_text;

/// Normalizer plus backend.
pub struct EmbeddingPipeline<B: EmbeddingBackend = Box<dyn EmbeddingBackend>> {
    backend: B,
}

impl<B: EmbeddingBackend> EmbeddingPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Embed one text.
    pub fn embed_text(&mut self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| SiftError::Inference("Backend returned no vector".to_string()))
    }

    /// Embed texts in order, one vector per text.
    ///
    /// An empty batch returns immediately without invoking the backend.
    pub fn embed_batch<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let normalized: Vec<String> = texts.iter().map(|t| normalize_text(t.as_ref())).collect();
        let vectors = self.backend.embed(&normalized)?;

        if vectors.len() != normalized.len() {
            return Err(SiftError::Inference(format!(
                "{} backend returned {} vectors for {} texts",
                self.backend.name(),
                vectors.len(),
                normalized.len()
            )));
        }

        debug!(backend = self.backend.name(), count = vectors.len(), "Batch embedded");
        Ok(vectors)
    }

    /// The backend, for inspection only.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: EmbeddingBackend> std::fmt::Debug for EmbeddingPipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingPipeline")
            .field("backend", &self.backend.name())
            .finish()
    }
}
