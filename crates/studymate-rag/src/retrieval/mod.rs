//! Embedding index and retrieval

mod hnsw;
pub mod index;
pub mod search;

pub use index::{EmbeddedChunks, EmbeddingIndexer, IndexBuild, SkippedChunk, VectorIndex};
pub use search::{retrieve, Retriever};
