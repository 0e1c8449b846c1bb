//! Question retrieval against a vector index

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::RankedChunk;

use super::index::VectorIndex;

/// Embeds questions and ranks indexed chunks against them
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    min_score: Option<f32>,
}

impl Retriever {
    /// Create a retriever; `embedder` must be the one the index was built with
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: &RetrievalConfig) -> Self {
        Self {
            embedder,
            min_score: config.min_score,
        }
    }

    /// The `k` chunks most similar to `question`, best first
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        question: &str,
        k: usize,
    ) -> Result<Vec<RankedChunk>> {
        if k == 0 {
            return Err(Error::config("k must be at least 1"));
        }
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(question).await?;
        let mut results = index.search(&query, k)?;

        if let Some(min_score) = self.min_score {
            results.retain(|r| r.score >= min_score);
        }

        tracing::debug!(
            k,
            returned = results.len(),
            top_score = results.first().map(|r| r.score),
            "Retrieved chunks"
        );

        Ok(results)
    }
}

/// One-shot retrieval without a similarity floor
pub async fn retrieve(
    index: &VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    question: &str,
    k: usize,
) -> Result<Vec<RankedChunk>> {
    Retriever::new(embedder, &RetrievalConfig::default())
        .retrieve(index, question, k)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingConfig, IndexConfig};
    use crate::providers::HashingEmbedder;
    use crate::retrieval::EmbeddingIndexer;
    use crate::types::{Chunk, WordRange};

    fn chunk(sequence: u32, text: &str) -> Chunk {
        Chunk {
            document_id: "bio.txt".to_string(),
            sequence,
            text: text.to_string(),
            words: WordRange {
                start: sequence as usize * 10,
                end: sequence as usize * 10 + 10,
            },
        }
    }

    async fn corpus(embedder: Arc<dyn EmbeddingProvider>) -> VectorIndex {
        let indexer = EmbeddingIndexer::new(embedder, &EmbeddingConfig::default(), IndexConfig::default());
        indexer
            .build(vec![
                chunk(0, "Mitochondria produce ATP through cellular respiration"),
                chunk(1, "Photosynthesis in chloroplasts converts light into sugar"),
                chunk(2, "The Krebs cycle runs inside mitochondria"),
            ])
            .await
            .unwrap()
            .index
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_chunk_first() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(512, 100).unwrap());
        let index = corpus(Arc::clone(&embedder)).await;

        let results = retrieve(&index, embedder, "How do chloroplasts use light?", 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.sequence, 1);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_k_zero_is_config_error() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(64, 100).unwrap());
        let index = corpus(Arc::clone(&embedder)).await;
        let err = retrieve(&index, embedder, "anything", 0).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(64, 100).unwrap());
        let index = VectorIndex::empty(IndexConfig::default());
        assert!(retrieve(&index, embedder, "anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_question_dimension_checked() {
        let index = corpus(Arc::new(HashingEmbedder::new(64, 100).unwrap())).await;
        let other: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(32, 100).unwrap());
        let err = retrieve(&index, other, "mitochondria", 1).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 64, actual: 32 }));
    }

    #[tokio::test]
    async fn test_min_score_filters_weak_matches() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(512, 100).unwrap());
        let index = corpus(Arc::clone(&embedder)).await;
        let retriever = Retriever::new(
            embedder,
            &RetrievalConfig {
                default_k: 3,
                min_score: Some(0.99),
            },
        );

        let results = retriever.retrieve(&index, "volcanic basalt", 3).await.unwrap();
        assert!(results.is_empty());
    }
}
