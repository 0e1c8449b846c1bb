//! Document text extraction
//!
//! Extractors are pure functions over the input bytes. Malformed input of any
//! kind is reported as [`Error::Extraction`]; it never panics out of this module.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Text extracted from a document
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Extracted text; empty is valid (e.g. scanned PDFs)
    pub text: String,
    /// Total pages, where the format has pages
    pub page_count: Option<u32>,
    /// SHA-256 of the extracted text
    pub content_hash: String,
}

impl ExtractedText {
    fn new(text: String, page_count: Option<u32>) -> Self {
        Self {
            content_hash: hash_content(&text),
            text,
            page_count,
        }
    }

    /// True when no non-whitespace text was found
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Converts raw document bytes to plain text
pub trait TextExtractor: Send + Sync {
    /// Extract text from `data`; `filename` is used for error reporting only
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// PDF extraction via `pdf-extract`, page count via `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// PDF headers may be preceded by junk, but only within the first 1024 bytes
    fn has_pdf_header(data: &[u8]) -> bool {
        let window = &data[..data.len().min(1024)];
        window.windows(5).any(|w| w == b"%PDF-")
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        if !Self::has_pdf_header(data) {
            return Err(Error::extraction(filename, "missing %PDF- header"));
        }

        // Third-party PDF parsers can panic on hostile input
        let page_count = catch_unwind(AssertUnwindSafe(|| lopdf::Document::load_mem(data)))
            .map_err(|_| Error::extraction(filename, "PDF structure parser panicked"))?
            .map_err(|e| Error::extraction(filename, e.to_string()))?
            .get_pages()
            .len() as u32;

        let text = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data)))
            .map_err(|_| Error::extraction(filename, "PDF text extractor panicked"))?
            .map_err(|e| Error::extraction(filename, e.to_string()))?;

        Ok(ExtractedText::new(text, Some(page_count)))
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Plain text and markdown
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let text = decode_utf8(filename, data)?;
        Ok(ExtractedText::new(text.to_string(), None))
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// HTML body text, skipping script and style content
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl TextExtractor for HtmlExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let html = decode_utf8(filename, data)?;
        let document = scraper::Html::parse_document(html);
        let body_selector = scraper::Selector::parse("body")
            .map_err(|e| Error::internal(format!("invalid selector: {:?}", e)))?;

        let mut content = String::new();

        if let Some(body) = document.select(&body_selector).next() {
            for node in body.descendants() {
                let Some(text) = node.value().as_text() else {
                    continue;
                };
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| name == "script" || name == "style");
                if hidden {
                    continue;
                }

                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if !content.is_empty() {
                        content.push(' ');
                    }
                    content.push_str(trimmed);
                }
            }
        }

        Ok(ExtractedText::new(content, None))
    }

    fn name(&self) -> &str {
        "html"
    }
}

/// Dispatches extraction by file type
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<FileType, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// A registry with no extractors
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register (or replace) the extractor for a file type
    pub fn register(&mut self, file_type: FileType, extractor: Arc<dyn TextExtractor>) {
        self.extractors.insert(file_type, extractor);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, file_type: FileType, extractor: Arc<dyn TextExtractor>) -> Self {
        self.register(file_type, extractor);
        self
    }

    pub fn supports(&self, file_type: FileType) -> bool {
        self.extractors.contains_key(&file_type)
    }

    /// Extract text from a named document
    pub fn extract(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let file_type = FileType::from_filename(filename);
        let extractor = self.extractors.get(&file_type).ok_or_else(|| {
            Error::UnsupportedFileType(format!("{} ({})", filename, file_type.display_name()))
        })?;

        tracing::debug!(filename, extractor = extractor.name(), "Extracting text");
        extractor.extract(filename, data)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let text: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);
        Self::empty()
            .with(FileType::Pdf, Arc::new(PdfExtractor))
            .with(FileType::Txt, Arc::clone(&text))
            .with(FileType::Markdown, text)
            .with(FileType::Html, Arc::new(HtmlExtractor))
    }
}

fn decode_utf8<'a>(filename: &str, data: &'a [u8]) -> Result<&'a str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    std::str::from_utf8(data).map_err(|e| {
        Error::extraction(
            filename,
            format!("invalid UTF-8 at byte {}", e.valid_up_to()),
        )
    })
}

/// Hash content for deduplication
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Single-page PDF with one line of Courier text
    fn build_pdf(line: &str) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_text_and_page_count() {
        let pdf = build_pdf("Gradient descent minimizes loss");
        let extracted = PdfExtractor.extract("ml.pdf", &pdf).unwrap();
        assert_eq!(extracted.page_count, Some(1));
        assert!(extracted.text.contains("Gradient"));
        assert!(extracted.text.contains("loss"));
    }

    #[test]
    fn test_malformed_pdf_is_error_not_panic() {
        let inputs: [&[u8]; 4] = [
            b"",
            b"not a pdf at all",
            b"%PDF-1.4\n%%EOF",
            &[0x25, 0x50, 0x44, 0x46, 0x2d, 0xff, 0x00, 0x13, 0x37],
        ];

        for input in inputs {
            let err = PdfExtractor.extract("broken.pdf", input).unwrap_err();
            assert!(matches!(err, Error::Extraction { .. }), "got {err:?}");
        }
    }

    #[test]
    fn test_truncated_pdf_is_error() {
        let pdf = build_pdf("Some text");
        let truncated = &pdf[..pdf.len() / 2];
        assert!(matches!(
            PdfExtractor.extract("cut.pdf", truncated),
            Err(Error::Extraction { .. })
        ));
    }

    #[test]
    fn test_plain_text_and_empty_text() {
        let extracted = PlainTextExtractor.extract("a.txt", b"\xEF\xBB\xBFhello world").unwrap();
        assert_eq!(extracted.text, "hello world");
        assert!(!extracted.is_empty());

        let empty = PlainTextExtractor.extract("b.txt", b"  \n\t ").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_extraction_error() {
        let err = PlainTextExtractor.extract("c.txt", b"ok \xFF\xFE bad").unwrap_err();
        match err {
            Error::Extraction { filename, message } => {
                assert_eq!(filename, "c.txt");
                assert!(message.contains("byte 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_html_skips_scripts() {
        let html = b"<html><head><title>t</title></head><body><h1>Cells</h1>\
            <script>var x = 1;</script><p>Mitochondria make ATP.</p></body></html>";
        let extracted = HtmlExtractor.extract("bio.html", html).unwrap();
        assert_eq!(extracted.text, "Cells Mitochondria make ATP.");
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ExtractorRegistry::default();
        assert!(registry.supports(FileType::Pdf));
        assert!(registry.supports(FileType::Markdown));

        let text = registry.extract("notes.md", b"# Title\nbody").unwrap();
        assert_eq!(text.text, "# Title\nbody");

        let err = registry.extract("slides.pptx", b"PK").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = PlainTextExtractor.extract("a.txt", b"same").unwrap();
        let b = PlainTextExtractor.extract("b.txt", b"same").unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.content_hash.len(), 64);
    }
}
