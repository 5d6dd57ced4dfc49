//! Batch embedding backend over ONNX Runtime.
//!
//! When compiled with the `onnx` feature, loads the runtime shared library
//! dynamically and submits each batch as one `[n, 1]` string tensor. Without
//! the feature, construction fails with `ModelLoad`.

use std::path::Path;

#[cfg(feature = "onnx")]
use std::path::PathBuf;

use sift_core::error::{Result, SiftError};

use crate::embedding::{BackendOptions, EmbeddingBackend};

#[cfg(feature = "onnx")]
use tracing::{debug, info};

/// ONNX Runtime-backed embedding backend.
///
/// The model must take exactly one string input and produce exactly one
/// `f32` output of shape `[n, dim]`. Any other output shape fails the batch
/// with `Inference`. Tokenization and pooling live inside the model graph.
pub struct OnnxBackend {
    #[cfg(feature = "onnx")]
    session: ort::session::Session,
    #[cfg(feature = "onnx")]
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBackend").finish_non_exhaustive()
    }
}

impl OnnxBackend {
    /// Load a single-input, single-output ONNX model.
    ///
    /// # Errors
    /// Returns `SiftError::ModelLoad` if the runtime library is missing, the
    /// file cannot be parsed, or the model has other than one input and one
    /// output.
    #[cfg(feature = "onnx")]
    pub fn new(model_path: &Path, options: BackendOptions) -> Result<Self> {
        crate::embedding::check_model_file(model_path)?;

        // load-dynamic panics rather than erroring when the shared library
        // cannot be found.
        let session = std::panic::catch_unwind(|| load_session(model_path, options))
            .map_err(|_| {
                SiftError::ModelLoad("ONNX Runtime shared library is not available".to_string())
            })??;

        let inputs = session.inputs().len();
        if inputs != 1 {
            return Err(SiftError::ModelLoad(format!(
                "Embedding models must expose exactly one input tensor, found {}",
                inputs
            )));
        }
        let outputs = session.outputs().len();
        if outputs != 1 {
            return Err(SiftError::ModelLoad(format!(
                "Embedding models must expose exactly one output tensor, found {}",
                outputs
            )));
        }

        info!(
            model = %model_path.display(),
            threads = ?options.num_threads,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session,
            model_path: model_path.to_path_buf(),
        })
    }

    /// Stub constructor when the `onnx` feature is disabled.
    #[cfg(not(feature = "onnx"))]
    pub fn new(model_path: &Path, _options: BackendOptions) -> Result<Self> {
        Err(SiftError::ModelLoad(format!(
            "Cannot load {}: ONNX support requires the `onnx` feature",
            model_path.display()
        )))
    }
}

#[cfg(feature = "onnx")]
fn load_session(model_path: &Path, options: BackendOptions) -> Result<ort::session::Session> {
    let builder = ort::session::Session::builder()
        .map_err(|e| SiftError::ModelLoad(format!("ONNX session builder: {}", e)))?;

    let builder = match options.num_threads {
        Some(threads) => builder
            .with_intra_threads(threads)
            .map_err(|e| SiftError::ModelLoad(format!("ONNX set threads: {}", e)))?,
        None => builder,
    };

    builder.commit_from_file(model_path).map_err(|e| {
        SiftError::ModelLoad(format!(
            "Failed to load ONNX model at {}: {}",
            model_path.display(),
            e
        ))
    })
}

// ---------------------------------------------------------------------------
// Real implementation (onnx feature enabled)
// ---------------------------------------------------------------------------

#[cfg(feature = "onnx")]
impl EmbeddingBackend for OnnxBackend {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use ort::value::Tensor;

        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch = texts.len();

        let input = Tensor::<String>::from_string_array(([batch, 1], texts))
            .map_err(|e| SiftError::Inference(format!("Failed to build input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| SiftError::Inference(format!("ONNX inference failed: {}", e)))?;

        // ort 2.0 try_extract_tensor returns (&Shape, &[f32]).
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SiftError::Inference(format!("Extract embeddings: {}", e)))?;

        let shape_dims: Vec<i64> = shape.iter().copied().collect();
        let rows = crate::embedding::rows_from_output(&shape_dims, data, batch)?;

        debug!(
            model = %self.model_path.display(),
            batch,
            dim = rows[0].len(),
            "ONNX batch embedded"
        );
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

// ---------------------------------------------------------------------------
// Stub implementation (onnx feature disabled)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "onnx"))]
impl EmbeddingBackend for OnnxBackend {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Err(SiftError::Inference(
            "ONNX embedding requires the `onnx` feature".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}
