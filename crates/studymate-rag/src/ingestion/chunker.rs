//! Word-window chunking with overlap

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, WordRange};

/// Splits text into overlapping fixed-size word windows
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a new chunker; fails unless `chunk_size > chunk_overlap`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::from_config(ChunkingConfig::new(chunk_size, chunk_overlap))
    }

    /// Create a chunker from validated configuration
    pub fn from_config(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Chunk `text` into windows tagged with `source_id`
    ///
    /// Windows start at `0, stride, 2*stride, ...` and stop once a start
    /// reaches the end of the word sequence. Empty or whitespace-only text
    /// yields no chunks.
    pub fn chunk(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let stride = self.config.stride();

        let mut chunks = Vec::with_capacity(words.len().div_ceil(stride));
        let mut start = 0usize;

        while start < words.len() {
            let end = (start + self.config.chunk_size).min(words.len());

            chunks.push(Chunk {
                document_id: source_id.to_string(),
                sequence: chunks.len() as u32,
                text: words[start..end].join(" "),
                words: WordRange { start, end },
            });

            start += stride;
        }

        chunks
    }
}

/// One-shot chunking
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    source_id: &str,
) -> Result<Vec<Chunk>> {
    Ok(TextChunker::new(chunk_size, chunk_overlap)?.chunk(text, source_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    /// Rebuild the word sequence from each chunk's non-overlapping part
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> Vec<String> {
        let mut words = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            words.extend(chunk.text.split(' ').skip(skip).map(str::to_string));
        }
        words
    }

    #[test]
    fn test_thousand_words_500_100() {
        let chunks = chunk_text(&numbered_words(1000), 500, 100, "doc.pdf").unwrap();

        let ranges: Vec<(usize, usize)> =
            chunks.iter().map(|c| (c.words.start, c.words.end)).collect();
        assert_eq!(ranges, vec![(0, 500), (400, 900), (800, 1000)]);

        assert_eq!(chunks[2].word_count(), 200);
        assert!(chunks[1].text.starts_with("w400 "));
        assert!(chunks.iter().all(|c| c.document_id == "doc.pdf"));
        assert_eq!(chunks.iter().map(|c| c.sequence).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        assert!(chunk_text("", 10, 2, "a").unwrap().is_empty());
        assert!(chunk_text(" \n\t  ", 10, 2, "a").unwrap().is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("the  quick\nbrown fox", 10, 3, "a").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "the quick brown fox");
        assert_eq!(chunks[0].words, WordRange { start: 0, end: 4 });
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(chunk_text("a b", 5, 5, "a"), Err(Error::Config(_))));
        assert!(matches!(chunk_text("a b", 5, 9, "a"), Err(Error::Config(_))));
        assert!(matches!(chunk_text("a b", 0, 0, "a"), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_overlap_partitions() {
        let chunks = chunk_text(&numbered_words(7), 3, 0, "a").unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["w0 w1 w2", "w3 w4 w5", "w6"]);
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_word_sequence(
            words in prop::collection::vec("[a-z]{1,8}", 0..400),
            size in 1usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % size;
            let text = words.join(" ");
            let chunks = chunk_text(&text, size, overlap, "p").unwrap();

            prop_assert_eq!(reconstruct(&chunks, overlap), words.clone());

            for chunk in &chunks {
                prop_assert!(chunk.word_count() <= size);
                prop_assert!(chunk.word_count() > 0);
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[1].words.start, pair[0].words.start + size - overlap);
                if pair[0].word_count() == size {
                    prop_assert_eq!(pair[0].words.end - pair[1].words.start, overlap);
                } else {
                    prop_assert_eq!(pair[1].words.end, pair[0].words.end);
                }
            }
        }
    }
}
