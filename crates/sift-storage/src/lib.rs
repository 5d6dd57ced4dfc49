//! Sift Storage crate - SQLite persistence for embedding vectors.
//!
//! Provides a SQLite connection wrapper with migrations, the portable
//! little-endian vector blob codec, and the session-partitioned
//! [`VectorStore`] with linear-scan cosine similarity search.

pub mod codec;
pub mod db;
pub mod migrations;
pub mod session;
pub mod store;

pub use codec::{decode_vector, encode_vector, l2_norm};
pub use db::Database;
pub use session::{sanitize_session_id, session_index_name};
pub use store::{Metadata, SearchResult, StoredEmbedding, VectorStore};
