//! Per-item embedding backend over TensorFlow Lite.
//!
//! When compiled with the `tflite` feature, runs one interpreter invocation
//! per text, sequentially. Without the feature, construction fails with
//! `ModelLoad`.
//!
//! The interpreter's input is a fixed-size byte tensor. Each text is written
//! into it as UTF-8, cut at a character boundary when too long and padded
//! with zero bytes when short.

use std::path::Path;

use sift_core::error::{Result, SiftError};

use crate::embedding::{BackendOptions, EmbeddingBackend};

#[cfg(feature = "tflite")]
use tracing::{debug, info};

/// TensorFlow Lite-backed embedding backend.
///
/// The model must take exactly one `uint8` or `int8` input of static shape
/// (typically `[1, max_bytes]`) and produce exactly one `f32` output of shape
/// `[1, dim]` or `[dim]`.
pub struct TfliteBackend {
    #[cfg(feature = "tflite")]
    interpreter: tflitec::interpreter::Interpreter<'static>,
    #[cfg(feature = "tflite")]
    input_width: usize,
}

// SAFETY: the interpreter is owned exclusively by this value and only
// reached through `&mut self`, so it is never used from two threads at once.
#[cfg(feature = "tflite")]
unsafe impl Send for TfliteBackend {}

impl std::fmt::Debug for TfliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfliteBackend").finish_non_exhaustive()
    }
}

impl TfliteBackend {
    /// Load a single-input, single-output TFLite model.
    ///
    /// # Errors
    /// Returns `SiftError::ModelLoad` if the file cannot be loaded or the
    /// model has other than one input and one output.
    #[cfg(feature = "tflite")]
    pub fn new(model_path: &Path, options: BackendOptions) -> Result<Self> {
        use tflitec::interpreter::{Interpreter, Options};

        crate::embedding::check_model_file(model_path)?;

        let path = model_path.to_str().ok_or_else(|| {
            SiftError::ModelLoad(format!(
                "Model path is not valid UTF-8: {}",
                model_path.display()
            ))
        })?;

        let mut interpreter_options = Options::default();
        if let Some(threads) = options.num_threads {
            interpreter_options.thread_count = threads as i32;
        }

        let interpreter = Interpreter::with_model_path(path, Some(interpreter_options))
            .map_err(|e| {
                SiftError::ModelLoad(format!(
                    "Failed to load TFLite model at {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        interpreter
            .allocate_tensors()
            .map_err(|e| SiftError::ModelLoad(format!("TFLite allocate tensors: {}", e)))?;

        let inputs = interpreter.input_tensor_count();
        if inputs != 1 {
            return Err(SiftError::ModelLoad(format!(
                "Embedding models must expose exactly one input tensor, found {}",
                inputs
            )));
        }
        let outputs = interpreter.output_tensor_count();
        if outputs != 1 {
            return Err(SiftError::ModelLoad(format!(
                "Embedding models must expose exactly one output tensor, found {}",
                outputs
            )));
        }

        let input_width = {
            let input = interpreter
                .input(0)
                .map_err(|e| SiftError::ModelLoad(format!("TFLite input tensor: {}", e)))?;
            let elements: usize = input.shape().dimensions().iter().product();
            let bytes = input.data::<u8>().len();
            if bytes == 0 || bytes != elements {
                return Err(SiftError::ModelLoad(format!(
                    "TFLite input must be a fixed-size uint8/int8 tensor, got shape {:?} \
                     over {} bytes",
                    input.shape().dimensions(),
                    bytes
                )));
            }
            bytes
        };

        info!(
            model = %model_path.display(),
            threads = ?options.num_threads,
            input_width,
            "Loaded TFLite embedding model"
        );

        Ok(Self {
            interpreter,
            input_width,
        })
    }

    /// Stub constructor when the `tflite` feature is disabled.
    #[cfg(not(feature = "tflite"))]
    pub fn new(model_path: &Path, _options: BackendOptions) -> Result<Self> {
        Err(SiftError::ModelLoad(format!(
            "Cannot load {}: TensorFlow Lite support requires the `tflite` feature",
            model_path.display()
        )))
    }
}

// ---------------------------------------------------------------------------
// Real implementation (tflite feature enabled)
// ---------------------------------------------------------------------------

#[cfg(feature = "tflite")]
impl EmbeddingBackend for TfliteBackend {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for text in texts {
            let input = self
                .interpreter
                .input(0)
                .map_err(|e| SiftError::Inference(format!("TFLite input tensor: {}", e)))?;
            input
                .set_data(&encode_text_bytes(text, self.input_width)[..])
                .map_err(|e| SiftError::Inference(format!("TFLite set input: {}", e)))?;

            self.interpreter
                .invoke()
                .map_err(|e| SiftError::Inference(format!("TFLite inference failed: {}", e)))?;

            let output = self
                .interpreter
                .output(0)
                .map_err(|e| SiftError::Inference(format!("TFLite output tensor: {}", e)))?;
            let shape = output_shape(output.shape().dimensions());
            let mut rows = crate::embedding::rows_from_output(&shape, output.data::<f32>(), 1)?;
            vectors.extend(rows.pop());
        }

        debug!(count = texts.len(), "TFLite items embedded");
        Ok(vectors)
    }

    fn name(&self) -> &'static str {
        "tflite"
    }
}

/// Output dimensions as `[rows, width]`; a flat `[width]` output is one row.
#[cfg(any(feature = "tflite", test))]
fn output_shape(dims: &[usize]) -> Vec<i64> {
    let dims: Vec<i64> = dims.iter().map(|&d| d as i64).collect();
    match dims.as_slice() {
        [width] => vec![1, *width],
        _ => dims,
    }
}

/// UTF-8 bytes of `text` in exactly `width` bytes: cut at the last character
/// boundary that fits, then zero-padded.
#[cfg(any(feature = "tflite", test))]
fn encode_text_bytes(text: &str, width: usize) -> Vec<u8> {
    let mut end = text.len().min(width);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut buf = Vec::with_capacity(width);
    buf.extend_from_slice(&text.as_bytes()[..end]);
    buf.resize(width, 0);
    buf
}

// ---------------------------------------------------------------------------
// Stub implementation (tflite feature disabled)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "tflite"))]
impl EmbeddingBackend for TfliteBackend {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Err(SiftError::Inference(
            "TFLite embedding requires the `tflite` feature".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "tflite"
    }
}
