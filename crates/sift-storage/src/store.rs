//! Session-partitioned vector storage with cosine-similarity search.
//!
//! Every record lives in the `embeddings` table keyed by id. Sessions are a
//! filter on `session_id`; search is an exact linear scan over one session.
//! Each write commits on its own, so there is never a pending batch to flush.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use sift_core::config::{StorageConfig, StoreLocation};
use sift_core::error::{Result, SiftError};

use crate::codec::{decode_vector, encode_vector, l2_norm};
use crate::db::Database;
use crate::session::create_session_index_sql;

/// String-keyed metadata attached to a stored vector.
pub type Metadata = serde_json::Map<String, Value>;

/// A full record as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub id: String,
    pub session_id: String,
    pub vector: Vec<f32>,
    pub norm: f64,
    pub metadata: Option<Metadata>,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Default)]
struct StoreState {
    dimension: Option<usize>,
    indexed_sessions: HashSet<String>,
}

/// Durable vector store over SQLite.
///
/// Locks are always taken connection first, then state.
#[derive(Debug)]
pub struct VectorStore {
    db: Database,
    state: Mutex<StoreState>,
    per_session_indexes: bool,
}

impl VectorStore {
    /// Open a store with lazy per-session indexes enabled.
    ///
    /// `dimension` pins the vector length up front; without it the length is
    /// taken from existing rows, or else from the first vector inserted or
    /// queried.
    pub fn open(location: &StoreLocation, dimension: Option<usize>) -> Result<Self> {
        Self::with_options(location, dimension, true)
    }

    /// Open a store from the `[storage]` config section.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::with_options(
            &config.location(),
            config.dimension,
            config.per_session_indexes,
        )
    }

    pub fn with_options(
        location: &StoreLocation,
        dimension: Option<usize>,
        per_session_indexes: bool,
    ) -> Result<Self> {
        if dimension == Some(0) {
            return Err(SiftError::InvalidVector(
                "Store dimension must be positive".to_string(),
            ));
        }

        let db = Database::open(location)?;
        let stored = db.with_conn(stored_dimension)?;

        let dimension = match (dimension, stored) {
            (Some(explicit), Some(existing)) if explicit != existing => {
                return Err(SiftError::DimensionMismatch {
                    expected: existing,
                    actual: explicit,
                });
            }
            (explicit, existing) => explicit.or(existing),
        };

        info!(
            location = %location,
            dimension = ?dimension,
            per_session_indexes,
            "Vector store opened"
        );

        Ok(Self {
            db,
            state: Mutex::new(StoreState {
                dimension,
                indexed_sessions: HashSet::new(),
            }),
            per_session_indexes,
        })
    }

    /// Insert or overwrite one vector and return its id.
    ///
    /// A fresh UUID is generated when `id` is `None`. Reusing an id replaces
    /// the whole prior record, including its session.
    pub fn add_vector(
        &self,
        session_id: &str,
        vector: &[f32],
        metadata: Option<&Metadata>,
        id: Option<&str>,
    ) -> Result<String> {
        validate_vector(vector)?;

        let metadata_json = metadata.map(serde_json::to_string).transpose()?;
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let blob = encode_vector(vector);
        let norm = l2_norm(vector);

        self.db.with_conn(|conn| {
            let mut state = self.lock_state()?;
            check_dimension(state.dimension, vector.len())?;

            if self.per_session_indexes && !state.indexed_sessions.contains(session_id) {
                conn.execute_batch(&create_session_index_sql(session_id))
                    .map_err(|e| {
                        SiftError::StorageIo(format!("Failed to create session index: {}", e))
                    })?;
                state.indexed_sessions.insert(session_id.to_string());
                debug!(session_id, "Per-session index ready");
            }

            conn.execute(
                "INSERT OR REPLACE INTO embeddings (id, session_id, vector, norm, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, session_id, blob, norm, metadata_json],
            )
            .map_err(|e| SiftError::StorageIo(format!("Failed to store vector: {}", e)))?;

            if state.dimension.is_none() {
                state.dimension = Some(vector.len());
                debug!(dimension = vector.len(), "Store dimension established");
            }

            Ok(())
        })?;

        trace!(session_id, id = %id, "Vector stored");
        Ok(id)
    }

    /// Insert vectors one by one, pairing `metadatas` by position.
    ///
    /// Missing metadata entries leave the trailing vectors without metadata;
    /// surplus entries are ignored. Every record commits independently: when
    /// one fails, the records before it stay stored and the error is
    /// returned.
    pub fn add_many(
        &self,
        session_id: &str,
        vectors: &[Vec<f32>],
        metadatas: &[Option<Metadata>],
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(vectors.len());

        for (i, vector) in vectors.iter().enumerate() {
            let metadata = metadatas.get(i).and_then(Option::as_ref);
            match self.add_vector(session_id, vector, metadata, None) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!(
                        session_id,
                        stored = ids.len(),
                        total = vectors.len(),
                        error = %e,
                        "Batch insert stopped; earlier records remain stored"
                    );
                    return Err(e);
                }
            }
        }

        Ok(ids)
    }

    /// Rank the session's vectors by cosine similarity to `query`.
    ///
    /// Stored vectors with zero norm are never returned. Equal scores keep
    /// insertion order.
    pub fn search(
        &self,
        session_id: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_norm = l2_norm(query);

        self.db.with_conn(|conn| {
            let dimension = {
                let mut state = self.lock_state()?;
                check_dimension(state.dimension, query.len())?;
                if query_norm == 0.0 || !query_norm.is_finite() {
                    return Err(SiftError::InvalidQuery(format!(
                        "Query vector norm must be finite and non-zero, got {}",
                        query_norm
                    )));
                }
                if state.dimension.is_none() {
                    state.dimension = Some(query.len());
                    debug!(dimension = query.len(), "Store dimension established");
                }
                query.len()
            };

            if top_k == 0 {
                return Ok(Vec::new());
            }

            let mut stmt = conn
                .prepare(
                    "SELECT id, vector, norm, metadata FROM embeddings
                     WHERE session_id = ?1
                     ORDER BY rowid",
                )
                .map_err(|e| SiftError::StorageIo(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })
                .map_err(|e| SiftError::StorageIo(e.to_string()))?;

            let mut scored = Vec::new();
            let mut skipped = 0usize;
            for row in rows {
                let (id, blob, norm, metadata) =
                    row.map_err(|e| SiftError::StorageIo(e.to_string()))?;
                if norm == 0.0 {
                    skipped += 1;
                    continue;
                }
                let candidate = decode_vector(&blob, Some(dimension))?;
                let dot: f64 = query
                    .iter()
                    .zip(candidate.iter())
                    .map(|(&a, &b)| f64::from(a) * f64::from(b))
                    .sum();
                let score = (dot / (query_norm * norm)).clamp(-1.0, 1.0);
                scored.push((id, score, metadata));
            }

            // Stable, so ties stay in rowid order.
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            scored.truncate(top_k);

            let results = scored
                .into_iter()
                .map(|(id, score, metadata)| {
                    Ok(SearchResult {
                        id,
                        score,
                        metadata: parse_metadata(metadata)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            debug!(
                session_id,
                returned = results.len(),
                skipped_zero_norm = skipped,
                "Search completed"
            );
            Ok(results)
        })
    }

    /// Fetch one record by id.
    pub fn get(&self, id: &str) -> Result<Option<StoredEmbedding>> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, session_id, vector, norm, metadata FROM embeddings WHERE id = ?1",
                    rusqlite::params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                            row.get::<_, f64>(3)?,
                            row.get::<_, Option<String>>(4)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| SiftError::StorageIo(e.to_string()))?;

            match row {
                Some((id, session_id, blob, norm, metadata)) => Ok(Some(StoredEmbedding {
                    id,
                    session_id,
                    vector: decode_vector(&blob, None)?,
                    norm,
                    metadata: parse_metadata(metadata)?,
                })),
                None => Ok(None),
            }
        })
    }

    /// Number of records, in one session or across the store.
    pub fn count(&self, session_id: Option<&str>) -> Result<usize> {
        self.db.with_conn(|conn| {
            let count: i64 = match session_id {
                Some(session) => conn.query_row(
                    "SELECT COUNT(*) FROM embeddings WHERE session_id = ?1",
                    rusqlite::params![session],
                    |row| row.get(0),
                ),
                None => conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0)),
            }
            .map_err(|e| SiftError::StorageIo(format!("Failed to count vectors: {}", e)))?;
            Ok(count as usize)
        })
    }

    /// Distinct session ids, sorted.
    pub fn sessions(&self) -> Result<Vec<String>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT DISTINCT session_id FROM embeddings ORDER BY session_id")
                .map_err(|e| SiftError::StorageIo(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| SiftError::StorageIo(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row.map_err(|e| SiftError::StorageIo(e.to_string()))?);
            }
            Ok(sessions)
        })
    }

    /// Established vector length, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.state.lock().ok().and_then(|state| state.dimension)
    }

    /// Release the database handle. Every later operation fails.
    pub fn close(&self) -> Result<()> {
        self.db.close()?;
        if let Ok(mut state) = self.state.lock() {
            state.indexed_sessions.clear();
        }
        info!("Vector store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_closed()
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| SiftError::StorageIo(format!("Store state lock poisoned: {}", e)))
    }
}

fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(SiftError::InvalidVector("Vector is empty".to_string()));
    }
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(SiftError::InvalidVector(format!(
            "Component {} is not finite",
            pos
        )));
    }
    Ok(())
}

fn check_dimension(established: Option<usize>, actual: usize) -> Result<()> {
    match established {
        Some(expected) if expected != actual => {
            Err(SiftError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Vector length of the oldest row, if the table has any.
fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
    let bytes: Option<i64> = conn
        .query_row(
            "SELECT length(vector) FROM embeddings ORDER BY rowid LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| SiftError::StorageIo(format!("Failed to read stored dimension: {}", e)))?;

    match bytes {
        None => Ok(None),
        Some(len) if len > 0 && len % 4 == 0 => Ok(Some(len as usize / 4)),
        Some(len) => Err(SiftError::StorageIo(format!(
            "Corrupt vector blob of {} bytes in existing store",
            len
        ))),
    }
}

fn parse_metadata(raw: Option<String>) -> Result<Option<Metadata>> {
    raw.map(|json| serde_json::from_str::<Metadata>(&json))
        .transpose()
        .map_err(SiftError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::session::session_index_name;

    fn memory_store() -> VectorStore {
        VectorStore::open(&StoreLocation::InMemory, None).unwrap()
    }

    fn meta(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn index_exists(store: &VectorStore, name: &str) -> bool {
        store
            .db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    rusqlite::params![name],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| SiftError::StorageIo(e.to_string()))
            })
            .unwrap()
            == 1
    }

    #[test]
    fn test_self_search_scores_one() {
        let store = memory_store();
        let v = vec![0.3, -1.2, 4.5, 0.01];
        let id = store.add_vector("s", &v, None, None).unwrap();

        let results = store.search("s", &v, 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ranked_scenario() {
        let store = memory_store();
        let a = store.add_vector("s1", &[1.0, 0.0], None, Some("A")).unwrap();
        store.add_vector("s1", &[0.0, 1.0], None, Some("B")).unwrap();
        store.add_vector("s1", &[0.9, 0.1], None, Some("C")).unwrap();
        assert_eq!(a, "A");

        let results = store.search("s1", &[1.0, 0.0], 2).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 0.9939).abs() < 1e-3);
    }

    #[test]
    fn test_add_many_pairs_metadata_by_position() {
        let store = memory_store();
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        let metadatas = vec![
            Some(meta(json!({"text": "first"}))),
            Some(meta(json!({"text": "second"}))),
        ];

        let ids = store.add_many("s", &vectors, &metadatas).unwrap();
        assert_eq!(ids.len(), 3);

        let first = store.get(&ids[0]).unwrap().unwrap();
        let second = store.get(&ids[1]).unwrap().unwrap();
        let third = store.get(&ids[2]).unwrap().unwrap();
        assert_eq!(first.metadata.unwrap()["text"], "first");
        assert_eq!(second.metadata.unwrap()["text"], "second");
        assert!(third.metadata.is_none());
    }

    #[test]
    fn test_add_many_ignores_surplus_metadata() {
        let store = memory_store();
        let metadatas = vec![
            Some(meta(json!({"n": 1}))),
            Some(meta(json!({"n": 2}))),
            Some(meta(json!({"n": 3}))),
        ];
        let ids = store.add_many("s", &[vec![1.0]], &metadatas).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.count(None).unwrap(), 1);
    }

    #[test]
    fn test_add_many_keeps_prefix_on_failure() {
        let store = memory_store();
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0, 0.0], vec![1.0, 1.0]];

        let err = store.add_many("s", &vectors, &[]).unwrap_err();
        assert!(matches!(
            err,
            SiftError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(store.count(Some("s")).unwrap(), 2);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = memory_store();
        store.add_vector("s1", &[1.0, 0.0], None, Some("x1")).unwrap();
        store.add_vector("s2", &[1.0, 0.0], None, Some("x2")).unwrap();

        let r1 = store.search("s1", &[1.0, 0.0], 10).unwrap();
        let r2 = store.search("s2", &[1.0, 0.0], 10).unwrap();
        assert_eq!(r1.len(), 1);
        assert_eq!(r1[0].id, "x1");
        assert_eq!(r2.len(), 1);
        assert_eq!(r2[0].id, "x2");
        assert!(store.search("s3", &[1.0, 0.0], 10).unwrap().is_empty());
    }

    #[test]
    fn test_same_id_moves_record_between_sessions() {
        let store = memory_store();
        store.add_vector("s1", &[1.0, 0.0], None, Some("shared")).unwrap();
        store.add_vector("s2", &[0.0, 1.0], None, Some("shared")).unwrap();

        assert!(store.search("s1", &[1.0, 0.0], 10).unwrap().is_empty());
        let r2 = store.search("s2", &[1.0, 0.0], 10).unwrap();
        assert_eq!(r2.len(), 1);
        assert_eq!(r2[0].id, "shared");
        assert_eq!(store.count(None).unwrap(), 1);
    }

    #[test]
    fn test_upsert_overwrites_vector_and_metadata() {
        let store = memory_store();
        let m1 = meta(json!({"v": 1}));
        let m2 = meta(json!({"v": 2}));
        store.add_vector("s", &[1.0, 0.0], Some(&m1), Some("id")).unwrap();
        store.add_vector("s", &[0.0, 2.0], Some(&m2), Some("id")).unwrap();

        let record = store.get("id").unwrap().unwrap();
        assert_eq!(record.vector, vec![0.0, 2.0]);
        assert!((record.norm - 2.0).abs() < 1e-12);
        assert_eq!(record.metadata, Some(m2));
        assert_eq!(store.count(Some("s")).unwrap(), 1);
    }

    #[test]
    fn test_dimension_mismatch_leaves_store_unchanged() {
        let store = memory_store();
        store.add_vector("s", &[1.0, 2.0, 3.0], None, Some("a")).unwrap();

        let err = store
            .add_vector("s", &[1.0, 2.0], None, Some("a"))
            .unwrap_err();
        assert!(matches!(
            err,
            SiftError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.count(None).unwrap(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().vector, vec![1.0, 2.0, 3.0]);
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = memory_store();
        store.add_vector("s", &[1.0, 0.0], None, None).unwrap();
        assert!(matches!(
            store.search("s", &[1.0, 0.0, 0.0], 1),
            Err(SiftError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_zero_query_is_invalid() {
        let store = memory_store();
        store.add_vector("s", &[1.0, 0.0], None, None).unwrap();
        assert!(matches!(
            store.search("s", &[0.0, 0.0], 1),
            Err(SiftError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_invalid_query_does_not_fix_dimension() {
        let store = memory_store();
        assert!(matches!(
            store.search("s", &[0.0, 0.0, 0.0], 1),
            Err(SiftError::InvalidQuery(_))
        ));
        assert_eq!(store.dimension(), None);

        assert!(store.search("s", &[1.0, 0.0], 1).unwrap().is_empty());
        assert_eq!(store.dimension(), Some(2));
        assert!(store.add_vector("s", &[1.0, 0.0, 0.0], None, None).is_err());
    }

    #[test]
    fn test_zero_norm_vector_stored_but_not_returned() {
        let store = memory_store();
        store.add_vector("s", &[0.0, 0.0], None, Some("zero")).unwrap();
        store.add_vector("s", &[0.0, 1.0], None, Some("unit")).unwrap();

        assert_eq!(store.count(Some("s")).unwrap(), 2);
        let results = store.search("s", &[0.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "unit");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let store = memory_store();
        for id in ["t1", "t2", "t3"] {
            store.add_vector("s", &[2.0, 0.0], None, Some(id)).unwrap();
        }
        let ids: Vec<String> = store
            .search("s", &[1.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_top_k_zero_returns_nothing() {
        let store = memory_store();
        store.add_vector("s", &[1.0], None, None).unwrap();
        assert!(store.search("s", &[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_empty_and_non_finite_vectors() {
        let store = memory_store();
        assert!(matches!(
            store.add_vector("s", &[], None, None),
            Err(SiftError::InvalidVector(_))
        ));
        assert!(matches!(
            store.add_vector("s", &[1.0, f32::NAN], None, None),
            Err(SiftError::InvalidVector(_))
        ));
        assert_eq!(store.dimension(), None);
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn test_generated_ids_are_unique_hex() {
        let store = memory_store();
        let a = store.add_vector("s", &[1.0], None, None).unwrap();
        let b = store.add_vector("s", &[1.0], None, None).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_metadata_roundtrips_through_search() {
        let store = memory_store();
        let m = meta(json!({"text": "hello", "tags": ["a", "b"], "n": 3}));
        store.add_vector("s", &[1.0, 0.0], Some(&m), None).unwrap();

        let results = store.search("s", &[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].metadata.as_ref(), Some(&m));
    }

    #[test]
    fn test_sessions_and_counts() {
        let store = memory_store();
        store.add_vector("beta", &[1.0], None, None).unwrap();
        store.add_vector("alpha", &[1.0], None, None).unwrap();
        store.add_vector("alpha", &[1.0], None, None).unwrap();

        assert_eq!(store.sessions().unwrap(), vec!["alpha", "beta"]);
        assert_eq!(store.count(Some("alpha")).unwrap(), 2);
        assert_eq!(store.count(None).unwrap(), 3);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_session_index_created_for_hostile_id() {
        let store = memory_store();
        let hostile = "x'); DROP TABLE embeddings; --";
        store.add_vector(hostile, &[1.0, 0.0], None, Some("h")).unwrap();

        assert!(index_exists(&store, &session_index_name(hostile)));
        assert_eq!(store.count(Some(hostile)).unwrap(), 1);
        assert_eq!(store.search(hostile, &[1.0, 0.0], 1).unwrap()[0].id, "h");
    }

    #[test]
    fn test_session_id_with_nul_is_writable() {
        let store = memory_store();
        let session = "a\0b";
        let id = store.add_vector(session, &[1.0, 0.0], None, Some("x")).unwrap();
        assert_eq!(id, "x");

        assert!(index_exists(&store, &session_index_name(session)));
        assert_eq!(store.count(Some(session)).unwrap(), 1);
        assert_eq!(store.count(Some("a")).unwrap(), 0);
        assert_eq!(store.search(session, &[1.0, 0.0], 1).unwrap()[0].id, "x");

        // A quoted id shares no index with its unquoted look-alike.
        store.add_vector("o'brien", &[0.0, 1.0], None, Some("q")).unwrap();
        assert!(index_exists(&store, &session_index_name("o'brien")));
        assert_eq!(store.search("o'brien", &[0.0, 1.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_session_indexes_can_be_disabled() {
        let store = VectorStore::with_options(&StoreLocation::InMemory, None, false).unwrap();
        store.add_vector("s1", &[1.0], None, None).unwrap();
        assert!(!index_exists(&store, &session_index_name("s1")));
    }

    #[test]
    fn test_close_makes_store_unusable() {
        let store = memory_store();
        store.add_vector("s", &[1.0], None, None).unwrap();
        store.close().unwrap();

        assert!(store.is_closed());
        assert!(matches!(
            store.add_vector("s", &[1.0], None, None),
            Err(SiftError::StorageIo(_))
        ));
        assert!(matches!(
            store.search("s", &[1.0], 1),
            Err(SiftError::StorageIo(_))
        ));
        assert!(matches!(store.count(None), Err(SiftError::StorageIo(_))));
    }

    #[test]
    fn test_reopen_recovers_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::Path(dir.path().join("vectors.db"));

        {
            let store = VectorStore::open(&location, None).unwrap();
            store.add_vector("s", &[1.0, 2.0, 3.0], None, Some("a")).unwrap();
            store.close().unwrap();
        }

        let store = VectorStore::open(&location, None).unwrap();
        assert_eq!(store.dimension(), Some(3));
        assert_eq!(store.get("a").unwrap().unwrap().vector, vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            store.add_vector("s", &[1.0], None, None),
            Err(SiftError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_reopen_with_conflicting_dimension_fails() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::Path(dir.path().join("vectors.db"));

        let store = VectorStore::open(&location, Some(2)).unwrap();
        store.add_vector("s", &[1.0, 0.0], None, None).unwrap();
        store.close().unwrap();

        assert!(matches!(
            VectorStore::open(&location, Some(4)),
            Err(SiftError::DimensionMismatch {
                expected: 2,
                actual: 4
            })
        ));
        assert!(VectorStore::open(&location, Some(2)).is_ok());
    }

    #[test]
    fn test_explicit_dimension_enforced_before_first_insert() {
        let store = VectorStore::open(&StoreLocation::InMemory, Some(4)).unwrap();
        assert_eq!(store.dimension(), Some(4));
        assert!(matches!(
            store.add_vector("s", &[1.0, 0.0], None, None),
            Err(SiftError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            VectorStore::open(&StoreLocation::InMemory, Some(0)),
            Err(SiftError::InvalidVector(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = StorageConfig {
            path: sift_core::config::IN_MEMORY.to_string(),
            dimension: Some(2),
            per_session_indexes: false,
        };
        let store = VectorStore::from_config(&config).unwrap();
        assert_eq!(store.dimension(), Some(2));
        assert!(!store.per_session_indexes);
    }
}
