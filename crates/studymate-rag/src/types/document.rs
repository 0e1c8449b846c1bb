//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// HTML document
    Html,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "html" | "htm" => Self::Html,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename's extension
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::Unknown => "Unknown",
        }
    }
}

/// A source document as handed to the engine
///
/// The identifier is the filename and must be unique within a corpus. Documents
/// are consumed by ingestion; only their chunks outlive it.
#[derive(Debug, Clone)]
pub struct Document {
    /// Filename, unique per corpus
    pub id: String,
    /// Raw file content
    pub content: Vec<u8>,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    /// File type inferred from the identifier
    pub fn file_type(&self) -> FileType {
        FileType::from_filename(&self.id)
    }
}

/// Half-open range of word offsets `[start, end)` within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRange {
    pub start: usize,
    pub end: usize,
}

impl WordRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl std::fmt::Display for WordRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{})", self.start, self.end)
    }
}

/// A contiguous word window of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of the source document
    pub document_id: String,
    /// Position of this chunk within its document
    pub sequence: u32,
    /// Words of the window joined by single spaces
    pub text: String,
    /// Word offsets covered by this chunk
    pub words: WordRange,
}

impl Chunk {
    /// Number of words in the chunk
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Format source for display
    pub fn format_source(&self) -> String {
        format!(
            "{}, words {}-{}",
            self.document_id, self.words.start, self.words.end
        )
    }
}
