//! Sift Vector crate - text normalization, embedding backends, pipeline, and search.
//!
//! Provides the [`EmbeddingBackend`] trait with ONNX Runtime (batch) and
//! TensorFlow Lite (per-item) implementations plus a mock for testing, the
//! [`EmbeddingPipeline`] that normalizes text before embedding, and the
//! [`SearchEngine`] that indexes and queries texts through a
//! [`VectorStore`](sift_storage::VectorStore).

pub mod embedding;
pub mod normalize;
pub mod onnx;
pub mod pipeline;
pub mod search;
pub mod tflite;

pub use embedding::{
    backend_from_config, create_backend, BackendOptions, EmbeddingBackend, MockBackend,
};
pub use normalize::normalize_text;
pub use onnx::OnnxBackend;
pub use pipeline::EmbeddingPipeline;
pub use search::SearchEngine;
pub use tflite::TfliteBackend;
