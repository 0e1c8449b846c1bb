//! studymate-rag: document retrieval and answer synthesis with cited sources
//!
//! Documents are extracted to text, split into overlapping word windows,
//! embedded and indexed. Questions are answered from the best-matching
//! chunks, either extractively or with a language model, and every answer
//! carries the chunks it was built from.
//!
//! [`CorpusManager`] is the entry point; everything else is usable on its own.

pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::{ChunkingConfig, RagConfig, SynthesisStrategy};
pub use corpus::{CorpusManager, CorpusState, CorpusStats};
pub use error::{Error, Result};
pub use generation::AnswerSynthesizer;
pub use providers::{ApiToken, EmbeddingProvider, LlmProvider};
pub use retrieval::{EmbeddingIndexer, Retriever, VectorIndex};
pub use types::{
    Answer, Chunk, Citation, Document, DocumentOutcome, DocumentStatus, FileType, IngestReport,
    QueryResult, RankedChunk, WordRange,
};
