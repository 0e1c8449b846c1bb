//! Core types for the RAG engine

pub mod document;
pub mod response;

pub use document::{Chunk, Document, FileType, WordRange};
pub use response::{
    Answer, ChunkFailure, Citation, DocumentOutcome, DocumentStatus, IngestReport, QueryResult,
    RankedChunk, NO_RELEVANT_INFORMATION,
};
