//! Deterministic feature-hashing embedder
//!
//! Maps each content word to a signed bucket derived from its SHA-256 digest,
//! weights by sublinear term frequency and L2-normalizes. No model download,
//! no randomness: equal text gives an equal vector on every platform.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "in",
    "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "where",
    "which", "who", "why", "with",
];

/// Lower-cased content words of `text`, stopwords removed
pub fn content_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words()
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// Feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    max_input_words: usize,
}

impl HashingEmbedder {
    /// Create a new embedder
    pub fn new(dimensions: usize, max_input_words: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("embedding dimensions must be greater than zero"));
        }
        Ok(Self {
            dimensions,
            max_input_words,
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(config.dimensions, config.max_input_words)
    }

    /// Bucket index and sign for a term
    fn feature(&self, term: &str) -> (usize, f32) {
        let digest = Sha256::digest(term.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(prefix);

        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }

    /// Embed synchronously
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        let word_count = text.split_whitespace().count();
        if word_count > self.max_input_words {
            return Err(Error::embedding(format!(
                "input has {} words, limit is {}",
                word_count, self.max_input_words
            )));
        }

        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for term in content_terms(text) {
            *counts.entry(term).or_insert(0) += 1;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (term, count) in &counts {
            let (bucket, sign) = self.feature(term);
            vector[bucket] += sign * (1.0 + (*count as f32).ln());
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_sync(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64, 100).unwrap();
        let a = embedder.embed_sync("Overfitting happens when a model memorizes noise").unwrap();
        let b = embedder.embed_sync("Overfitting happens when a model memorizes noise").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_related_text_scores_higher() {
        let embedder = HashingEmbedder::new(1024, 100).unwrap();
        let query = embedder.embed_sync("What is photosynthesis?").unwrap();
        let related = embedder
            .embed_sync("Photosynthesis converts light into chemical energy")
            .unwrap();
        let unrelated = embedder.embed_sync("The French revolution began in 1789").unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_stopwords_only_gives_zero_vector() {
        let embedder = HashingEmbedder::new(32, 100).unwrap();
        let v = embedder.embed_sync("what is the").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_input_limit() {
        let embedder = HashingEmbedder::new(32, 5).unwrap();
        let err = embedder.embed_sync("one two three four five six").unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(embedder.embed_sync("one two three four five").is_ok());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(HashingEmbedder::new(0, 10), Err(Error::Config(_))));
    }
}
