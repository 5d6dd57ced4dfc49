//! Text canonicalization applied before every embedding call.

use unicode_normalization::UnicodeNormalization;

/// Canonicalize text for embedding.
///
/// Applies NFKC, lowercases, collapses whitespace runs to one space and
/// trims both ends. Lowercasing can yield characters that NFKC would fold
/// again, so composition runs a second time to keep the function idempotent.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    let composed: String = lowered.nfkc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}
