//! Document ingestion: text extraction and word-window chunking

mod chunker;
mod parser;

pub use chunker::{chunk_text, TextChunker};
pub use parser::{
    ExtractedText, ExtractorRegistry, HtmlExtractor, PdfExtractor, PlainTextExtractor,
    TextExtractor,
};
