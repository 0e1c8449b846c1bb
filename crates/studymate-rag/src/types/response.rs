//! Response types for queries and ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{Chunk, WordRange};
use crate::config::SynthesisStrategy;
use crate::corpus::CorpusState;
use crate::generation::citation::truncate_snippet;

/// Answer text returned when no chunk was retrieved
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Longest snippet carried by a citation
const SNIPPET_CHARS: usize = 300;

/// A retrieved chunk with its similarity to the question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    /// Cosine similarity (higher is more similar)
    pub score: f32,
}

/// Synthesized answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Answer grounded in retrieved chunks
    Grounded {
        text: String,
        strategy: SynthesisStrategy,
    },
    /// Nothing was retrieved, so no model was invoked
    NoRelevantInformation,
}

impl Answer {
    /// Text to show the user
    pub fn text(&self) -> &str {
        match self {
            Answer::Grounded { text, .. } => text,
            Answer::NoRelevantInformation => NO_RELEVANT_INFORMATION,
        }
    }

    pub fn is_grounded(&self) -> bool {
        matches!(self, Answer::Grounded { .. })
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Result of `ask`; owned by the caller, never retained by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The question as asked
    pub question: String,
    /// Synthesized answer
    pub answer: Answer,
    /// Retrieved chunks, best first
    pub sources: Vec<RankedChunk>,
    /// When the answer was produced
    pub answered_at: DateTime<Utc>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResult {
    /// Citations for each source, in rank order
    pub fn citations(&self) -> Vec<Citation> {
        self.sources.iter().map(Citation::from_ranked).collect()
    }
}

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Source filename
    pub filename: String,
    /// Chunk position within the document
    pub chunk_index: u32,
    /// Word offsets of the chunk
    pub word_range: WordRange,
    /// Similarity score
    pub score: f32,
    /// Leading part of the chunk text
    pub snippet: String,
}

impl Citation {
    /// Create a citation from a ranked chunk
    pub fn from_ranked(ranked: &RankedChunk) -> Self {
        Self {
            filename: ranked.chunk.document_id.clone(),
            chunk_index: ranked.chunk.sequence,
            word_range: ranked.chunk.words,
            score: ranked.score,
            snippet: truncate_snippet(&ranked.chunk.text, SNIPPET_CHARS),
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!(
            "[Source: {}, words {}-{}]",
            self.filename, self.word_range.start, self.word_range.end
        )
    }
}

/// A chunk that was left out of the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFailure {
    /// Chunk position within the document
    pub sequence: u32,
    /// Why it was skipped
    pub message: String,
}

/// What happened to one document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Document was chunked and (some of) its chunks indexed
    Indexed {
        chunks_added: usize,
        skipped_chunks: Vec<ChunkFailure>,
        page_count: Option<u32>,
        /// Extraction succeeded but produced no text
        empty_text: bool,
    },
    /// Document contributed nothing to the index
    Failed {
        /// Error kind label, e.g. `extraction_error` or `timeout`
        kind: String,
        message: String,
    },
}

/// Per-document ingestion outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Document identifier (filename)
    pub document_id: String,
    pub status: DocumentStatus,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DocumentStatus::Indexed { .. })
    }

    pub fn chunks_added(&self) -> usize {
        match self.status {
            DocumentStatus::Indexed { chunks_added, .. } => chunks_added,
            DocumentStatus::Failed { .. } => 0,
        }
    }
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// One outcome per submitted document, in submission order
    pub documents: Vec<DocumentOutcome>,
    /// Total chunks added across all documents
    pub total_chunks_added: usize,
    /// Corpus state once the batch finished
    pub state: CorpusState,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl IngestReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.documents.iter().filter(|d| d.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.documents.iter().filter(|d| !d.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(text: &str) -> RankedChunk {
        RankedChunk {
            chunk: Chunk {
                document_id: "notes.pdf".to_string(),
                sequence: 2,
                text: text.to_string(),
                words: WordRange { start: 800, end: 1000 },
            },
            score: 0.75,
        }
    }

    #[test]
    fn test_sentinel_answer_is_named_and_non_empty() {
        let answer = Answer::NoRelevantInformation;
        assert!(!answer.is_grounded());
        assert_eq!(answer.text(), NO_RELEVANT_INFORMATION);
        assert!(!answer.to_string().is_empty());
    }

    #[test]
    fn test_citation_format_and_snippet() {
        let long = "word ".repeat(200);
        let citation = Citation::from_ranked(&ranked(&long));
        assert_eq!(citation.format_inline(), "[Source: notes.pdf, words 800-1000]");
        assert!(citation.snippet.len() <= SNIPPET_CHARS + 3);
        assert!(citation.snippet.ends_with("..."));

        let short = Citation::from_ranked(&ranked("short text"));
        assert_eq!(short.snippet, "short text");
    }

    #[test]
    fn test_answer_serializes_with_kind_tag() {
        let json = serde_json::to_value(Answer::NoRelevantInformation).unwrap();
        assert_eq!(json["kind"], "no_relevant_information");

        let json = serde_json::to_value(Answer::Grounded {
            text: "Overfitting is memorization.".to_string(),
            strategy: SynthesisStrategy::Extractive,
        })
        .unwrap();
        assert_eq!(json["kind"], "grounded");
        assert_eq!(json["strategy"], "extractive");
    }
}
