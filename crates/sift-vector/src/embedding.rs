//! Embedding backend trait, backend factory, and the mock implementation.
//!
//! - [`OnnxBackend`](crate::onnx::OnnxBackend) submits a whole batch to ONNX
//!   Runtime in one call. This is the production backend.
//! - [`TfliteBackend`](crate::tflite::TfliteBackend) runs one TensorFlow Lite
//!   invocation per text.
//! - [`MockBackend`] provides deterministic hash-based vectors for testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use sift_core::config::{BackendKind, EmbeddingConfig};
use sift_core::error::{Result, SiftError};

use crate::onnx::OnnxBackend;
use crate::tflite::TfliteBackend;

/// Runtime that turns normalized texts into vectors.
///
/// Output order matches input order, one vector per text. An empty input
/// returns an empty output without touching the runtime.
///
/// A backend owns one mutable inference session. It can be moved to another
/// thread, but concurrent callers must serialize access themselves.
pub trait EmbeddingBackend: Send {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

impl<B: EmbeddingBackend + ?Sized> EmbeddingBackend for Box<B> {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Tuning knobs applied when a backend loads its model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// Intra-op thread count; `None` keeps the runtime default.
    pub num_threads: Option<usize>,
}

impl From<&EmbeddingConfig> for BackendOptions {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            num_threads: config.num_threads,
        }
    }
}

/// Construct the backend named by `backend`.
///
/// Fails with `UnsupportedBackend` for an unknown name and `ModelLoad` when
/// the runtime or the model artifact is unusable.
pub fn create_backend(
    backend: &str,
    model_path: &Path,
    options: BackendOptions,
) -> Result<Box<dyn EmbeddingBackend>> {
    let kind: BackendKind = backend.parse()?;
    match kind {
        BackendKind::Onnx => Ok(Box::new(OnnxBackend::new(model_path, options)?)),
        BackendKind::Tflite => Ok(Box::new(TfliteBackend::new(model_path, options)?)),
    }
}

/// Construct the backend described by the `[embedding]` config section.
pub fn backend_from_config(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingBackend>> {
    create_backend(
        &config.backend,
        &config.resolved_model_path(),
        BackendOptions::from(config),
    )
}

#[cfg_attr(not(any(feature = "onnx", feature = "tflite")), allow(dead_code))]
pub(crate) fn check_model_file(model_path: &Path) -> Result<()> {
    if !model_path.is_file() {
        return Err(SiftError::ModelLoad(format!(
            "Model file not found at {}",
            model_path.display()
        )));
    }
    Ok(())
}

/// Split a flat `[batch, width]` output buffer into one row per text.
///
/// Any other rank, a leading dimension that is not `batch`, a zero width, or
/// a buffer whose length disagrees with the shape is an `Inference` error.
#[cfg_attr(not(any(feature = "onnx", feature = "tflite")), allow(dead_code))]
pub(crate) fn rows_from_output(
    shape: &[i64],
    data: &[f32],
    batch: usize,
) -> Result<Vec<Vec<f32>>> {
    let (rows, width) = match shape {
        [rows, width] => (*rows, *width),
        _ => {
            return Err(SiftError::Inference(format!(
                "Expected output shape [{}, width], got {:?}",
                batch, shape
            )))
        }
    };
    if usize::try_from(rows).ok() != Some(batch) {
        return Err(SiftError::Inference(format!(
            "Output has {} rows for a batch of {}",
            rows, batch
        )));
    }
    let width = match usize::try_from(width) {
        Ok(w) if w > 0 => w,
        _ => {
            return Err(SiftError::Inference(format!(
                "Output width must be positive, got {}",
                width
            )))
        }
    };
    if batch.checked_mul(width) != Some(data.len()) {
        return Err(SiftError::Inference(format!(
            "Output buffer holds {} values, shape {:?} needs {}",
            data.len(),
            shape,
            batch.saturating_mul(width)
        )));
    }
    Ok(data.chunks_exact(width).map(<[f32]>::to_vec).collect())
}

// ---------------------------------------------------------------------------
// MockBackend - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock backend returning deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs. The empty string maps to the zero
/// vector, which exercises the store's zero-norm handling.
#[derive(Debug, Clone)]
pub struct MockBackend {
    dimension: usize,
    calls: usize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl MockBackend {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of `embed` calls that reached the runtime.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// The vector `embed` produces for one text.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if text.is_empty() {
            return vec![0.0; self.dimension];
        }

        let mut result = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }
        result
    }
}

impl EmbeddingBackend for MockBackend {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.calls += 1;
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
