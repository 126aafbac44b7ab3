//! In-memory vector index with brute-force cosine similarity search.
//!
//! Search is O(n) over all stored chunks, which is acceptable for the
//! document-folder scale this targets. The whole index persists to a single
//! JSON file so a rebuilt corpus can be reused across runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::RetrievalError;

/// A single hit returned from a vector search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The ID of the matching chunk.
    pub id: Uuid,
    /// Cosine similarity score.
    pub score: f64,
    /// The chunk text.
    pub text: String,
    /// Name of the source document.
    pub source: String,
}

/// An entry stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    embedding: Vec<f32>,
    text: String,
    source: String,
}

/// Serialized form of the whole index.
#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    dimensions: usize,
    entries: HashMap<Uuid, IndexEntry>,
}

/// In-memory vector index using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock. All entries must share one embedding
/// dimensionality; the first insert fixes it.
#[derive(Debug)]
pub struct VectorIndex {
    inner: RwLock<IndexInner>,
}

#[derive(Debug, Default)]
struct IndexInner {
    dimensions: usize,
    entries: HashMap<Uuid, IndexEntry>,
}

impl VectorIndex {
    /// Create a new empty vector index.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
        }
    }

    /// Insert a chunk with its embedding into the index.
    ///
    /// Overwrites any existing entry with the same ID. Fails if the
    /// embedding dimensionality disagrees with earlier inserts.
    pub fn insert(
        &self,
        id: Uuid,
        embedding: Vec<f32>,
        text: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), RetrievalError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| RetrievalError::Index(format!("lock poisoned: {}", e)))?;

        if inner.entries.is_empty() {
            inner.dimensions = embedding.len();
        } else if embedding.len() != inner.dimensions {
            return Err(RetrievalError::Index(format!(
                "dimension mismatch: index has {}, got {}",
                inner.dimensions,
                embedding.len()
            )));
        }

        inner.entries.insert(
            id,
            IndexEntry {
                embedding,
                text: text.into(),
                source: source.into(),
            },
        );
        Ok(())
    }

    /// Search for the k nearest chunks to the query vector by cosine
    /// similarity. Results are sorted by descending score.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| RetrievalError::Index(format!("lock poisoned: {}", e)))?;

        let mut scored: Vec<SearchHit> = inner
            .entries
            .iter()
            .map(|(id, entry)| SearchHit {
                id: *id,
                score: cosine_similarity(query, &entry.embedding),
                text: entry.text.clone(),
                source: entry.source.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored)
    }

    /// Return the number of chunks currently stored in the index.
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.entries.len()).unwrap_or(0)
    }

    /// Return true if the index contains no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the index to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), RetrievalError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| RetrievalError::Index(format!("lock poisoned: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let persisted = PersistedIndex {
            dimensions: inner.dimensions,
            entries: inner.entries.clone(),
        };
        let json = serde_json::to_string(&persisted)
            .map_err(|e| RetrievalError::Persistence(e.to_string()))?;
        std::fs::write(path, json)?;

        info!(path = %path.display(), chunks = inner.entries.len(), "Index saved");
        Ok(())
    }

    /// Load a previously persisted index from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        let json = std::fs::read_to_string(path)?;
        let persisted: PersistedIndex =
            serde_json::from_str(&json).map_err(|e| RetrievalError::Persistence(e.to_string()))?;

        info!(path = %path.display(), chunks = persisted.entries.len(), "Index loaded");
        Ok(Self {
            inner: RwLock::new(IndexInner {
                dimensions: persisted.dimensions,
                entries: persisted.entries,
            }),
        })
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// lengths or zero-magnitude inputs.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
