//! Document store: ingestion plus the `Retriever` trait.
//!
//! `DocumentStore` turns a folder of text documents into a persisted vector
//! index on first open and answers similarity queries against it afterwards.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use tome_core::types::Passage;

use crate::chunker::chunk_text;
use crate::embedding::DynEmbeddingService;
use crate::error::RetrievalError;
use crate::index::VectorIndex;

/// Ordered passage retrieval for a query string.
///
/// The returned order is the final rank; ties stay in whatever order the
/// underlying index produced them.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages relevant to `query`, best first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError>;
}

/// Extensions accepted by ingestion. Anything else is an
/// `UnsupportedInput` error, fatal to the ingestion phase.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// A folder-backed document store with a persisted vector index.
pub struct DocumentStore {
    index: VectorIndex,
    embedder: Box<dyn DynEmbeddingService>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Open a store for `docs_folder`.
    ///
    /// Loads the persisted index from `index_path` when it exists;
    /// otherwise reads and chunks every supported document in the folder,
    /// embeds the chunks, and saves the freshly built index to
    /// `index_path`.
    pub async fn open(
        docs_folder: &Path,
        index_path: &Path,
        chunk_size: usize,
        chunk_overlap: usize,
        embedder: Box<dyn DynEmbeddingService>,
    ) -> Result<Self, RetrievalError> {
        if index_path.exists() {
            let index = VectorIndex::load(index_path)?;
            return Ok(Self { index, embedder });
        }

        info!(folder = %docs_folder.display(), "Saved index not found. Indexing documents");
        let index = VectorIndex::new();

        let mut files: Vec<_> = std::fs::read_dir(docs_folder)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && !path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with('.'))
                        .unwrap_or(true)
            })
            .collect();
        files.sort();

        for path in files {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
                return Err(RetrievalError::UnsupportedInput(path));
            }

            let text = std::fs::read_to_string(&path)?;
            let source = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            let chunks = chunk_text(&text, chunk_size, chunk_overlap);
            info!(file = %source, chunks = chunks.len(), "Loaded document");

            for chunk in chunks {
                let embedding = embedder.embed_boxed(&chunk).await?;
                index.insert(Uuid::new_v4(), embedding, chunk, source.clone())?;
            }
        }

        info!(chunks = index.len(), "Indexed documents");
        index.save(index_path)?;

        Ok(Self { index, embedder })
    }

    /// Number of chunks in the underlying index.
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

#[async_trait]
impl Retriever for DocumentStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError> {
        let query_vec = self.embedder.embed_boxed(query).await?;
        let hits = self.index.search(&query_vec, top_k)?;
        debug!(query_len = query.len(), hits = hits.len(), "Similarity search");

        Ok(hits
            .into_iter()
            .map(|hit| Passage {
                content: hit.text,
                source: hit.source,
                score: hit.score,
            })
            .collect())
    }
}
