//! Portable binary encoding for embedding vectors.
//!
//! Vectors are persisted as packed IEEE-754 `f32` values in little-endian
//! order, four bytes per component and no header, whatever the host's native
//! byte order. Wider inputs are narrowed to `f32` on the way in; that loss of
//! precision is part of the storage format.

use sift_core::error::{Result, SiftError};

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Encode a vector as a little-endian `f32` blob.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * F32_BYTES);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a blob produced by [`encode_vector`].
///
/// When `dimension` is given, the blob must hold exactly that many values.
pub fn decode_vector(blob: &[u8], dimension: Option<usize>) -> Result<Vec<f32>> {
    if blob.len() % F32_BYTES != 0 {
        return Err(SiftError::StorageIo(format!(
            "Corrupt vector blob: {} bytes is not a multiple of {}",
            blob.len(),
            F32_BYTES
        )));
    }
    let len = blob.len() / F32_BYTES;
    if let Some(expected) = dimension {
        if len != expected {
            return Err(SiftError::StorageIo(format!(
                "Corrupt vector blob: expected {} values, found {}",
                expected, len
            )));
        }
    }

    Ok(blob
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// L2 magnitude, accumulated in `f64`.
pub fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt()
}
