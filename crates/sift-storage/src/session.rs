//! Identifier construction for per-session indexes.
//!
//! SQLite does not accept bound parameters in DDL, so the per-session partial
//! index has its name and `WHERE` literal spliced into the statement text.
//! Session ids come from callers and are never trusted in that position: the
//! name is built only from `[A-Za-z0-9_]`, and the literal is written as a
//! hex blob cast to text, so no byte of the raw id reaches the statement.

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_session_id(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Name of the partial index covering one session.
///
/// Sanitizing is lossy (`"a-b"` and `"a_b"` collapse to the same text), so an
/// FNV-1a hash of the raw id is appended to keep distinct sessions on
/// distinct indexes.
pub fn session_index_name(session_id: &str) -> String {
    format!(
        "idx_embeddings_s_{}_{:08x}",
        sanitize_session_id(session_id),
        fnv1a_32(session_id.as_bytes())
    )
}

/// `CREATE INDEX` statement for the partial index over one session.
pub(crate) fn create_session_index_sql(session_id: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON embeddings (id) WHERE session_id = {}",
        session_index_name(session_id),
        hex_text_literal(session_id)
    )
}

/// `CAST(X'..' AS TEXT)` expression equal to `value` under UTF-8.
///
/// Quotes, NUL and any other byte SQLite's tokenizer would trip on are
/// carried as hex digits.
fn hex_text_literal(value: &str) -> String {
    let mut hex = String::with_capacity(value.len() * 2);
    for b in value.bytes() {
        hex.push_str(&format!("{:02X}", b));
    }
    format!("CAST(X'{}' AS TEXT)", hex)
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
