//! Corpus lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a corpus
///
/// ```text
/// EMPTY -> INDEXING -> READY <-> INDEXING
///              \-> FAILED -> INDEXING
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorpusState {
    /// Nothing has been indexed yet
    #[default]
    Empty,
    /// An ingest is running
    Indexing,
    /// The last ingest published an index
    Ready,
    /// The last ingest indexed no document
    Failed,
}

impl CorpusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorpusState::Empty => "empty",
            CorpusState::Indexing => "indexing",
            CorpusState::Ready => "ready",
            CorpusState::Failed => "failed",
        }
    }
}

impl fmt::Display for CorpusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
