//! Document ingestion and passage retrieval for Tome.
//!
//! Turns a folder of text documents into an embedded vector index and
//! answers similarity queries against it. The conversation core consumes
//! this crate only through the [`Retriever`] trait.

pub mod chunker;
pub mod embedding;
pub mod error;
pub mod index;
pub mod store;

pub use embedding::{DynEmbeddingService, EmbeddingService, HashEmbedding, OpenAiEmbedding};
pub use error::RetrievalError;
pub use index::VectorIndex;
pub use store::{DocumentStore, Retriever};
