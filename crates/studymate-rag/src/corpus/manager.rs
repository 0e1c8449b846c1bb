//! Corpus manager: owns the published index and runs ingest and ask
//!
//! Single writer, many readers. `ingest` calls are serialized by an async
//! mutex; the published index is an `Arc` swapped under a short write lock, so
//! concurrent `ask` calls see either the old or the new index, never a mix.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::{ChunkingConfig, EmbeddingBackend, RagConfig, SynthesisStrategy};
use crate::error::{Error, Result};
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{ExtractorRegistry, TextChunker};
use crate::providers::{
    ApiToken, EmbeddingProvider, HashingEmbedder, LlmProvider, OllamaClient, OllamaEmbedder,
    OllamaLlm,
};
use crate::retrieval::{EmbeddingIndexer, Retriever, VectorIndex};
use crate::types::{
    Chunk, ChunkFailure, Document, DocumentOutcome, DocumentStatus, IngestReport, QueryResult,
};

use super::state::CorpusState;

/// Snapshot of corpus size and state
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CorpusStats {
    pub state: CorpusState,
    /// Documents with at least one indexed chunk
    pub documents: usize,
    pub chunks: usize,
    pub dimension: Option<usize>,
    /// Whether queries use the HNSW graph
    pub approximate: bool,
}

/// Owns one corpus and its index lifecycle
pub struct CorpusManager {
    config: RagConfig,
    extractors: Arc<ExtractorRegistry>,
    indexer: EmbeddingIndexer,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    index: RwLock<Option<Arc<VectorIndex>>>,
    state: RwLock<CorpusState>,
    writer: Mutex<()>,
}

/// Work produced for one document before publication
struct DocumentWork {
    embedded: Vec<(Chunk, Vec<f32>)>,
    skipped: Vec<ChunkFailure>,
    page_count: Option<u32>,
    empty_text: bool,
}

/// Puts the corpus back in its prior state unless disarmed
///
/// Dropping an in-flight `ingest` future drops this guard, so a cancelled
/// ingest never leaves the corpus in `Indexing`.
struct StateGuard<'a> {
    state: &'a RwLock<CorpusState>,
    restore: CorpusState,
    armed: bool,
}

impl StateGuard<'_> {
    fn finish(mut self, state: CorpusState) {
        *self.state.write() = state;
        self.armed = false;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.write() = self.restore;
            tracing::warn!(state = %self.restore, "Ingest abandoned, corpus state restored");
        }
    }
}

impl CorpusManager {
    /// Create a manager over explicit providers
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self> {
        config.validate()?;

        let indexer = EmbeddingIndexer::new(
            Arc::clone(&embedder),
            &config.embeddings,
            config.index.clone(),
        );
        let retriever = Retriever::new(embedder, &config.retrieval);
        let synthesizer = AnswerSynthesizer::from_config(&config.synthesis, llm)?;

        tracing::info!(
            strategy = ?synthesizer.strategy(),
            embedder = indexer.embedder().name(),
            dimensions = indexer.embedder().dimensions(),
            "Corpus manager initialized"
        );

        Ok(Self {
            config,
            extractors: Arc::new(ExtractorRegistry::default()),
            indexer,
            retriever,
            synthesizer,
            index: RwLock::new(None),
            state: RwLock::new(CorpusState::Empty),
            writer: Mutex::new(()),
        })
    }

    /// Create a manager with providers chosen by `config`
    ///
    /// `token`, if given, is sent to the Ollama endpoint as a bearer token.
    pub fn from_config(config: RagConfig, token: Option<ApiToken>) -> Result<Self> {
        let needs_llm = config.synthesis.strategy != SynthesisStrategy::Extractive;
        let needs_ollama = needs_llm || config.embeddings.backend == EmbeddingBackend::Ollama;

        let client = if needs_ollama {
            Some(Arc::new(OllamaClient::new(&config.llm, token)?))
        } else {
            None
        };

        let embedder: Arc<dyn EmbeddingProvider> = match &client {
            Some(client) if config.embeddings.backend == EmbeddingBackend::Ollama => Arc::new(
                OllamaEmbedder::new(Arc::clone(client), &config.embeddings),
            ),
            _ => Arc::new(HashingEmbedder::from_config(&config.embeddings)?),
        };

        let llm = match client {
            Some(client) if needs_llm => Some(Arc::new(OllamaLlm::new(client)) as Arc<dyn LlmProvider>),
            _ => None,
        };

        Self::new(config, embedder, llm)
    }

    /// Replace the extractor registry
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Arc::new(extractors);
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn state(&self) -> CorpusState {
        *self.state.read()
    }

    /// The published index, if any
    pub fn current_index(&self) -> Option<Arc<VectorIndex>> {
        self.index.read().clone()
    }

    pub fn stats(&self) -> CorpusStats {
        let index = self.current_index();
        CorpusStats {
            state: self.state(),
            documents: index.as_ref().map(|i| i.document_ids().len()).unwrap_or(0),
            chunks: index.as_ref().map(|i| i.len()).unwrap_or(0),
            dimension: index.as_ref().and_then(|i| i.dimension()),
            approximate: index.as_ref().is_some_and(|i| i.has_ann()),
        }
    }

    /// Ingest a batch of documents and publish the merged index
    ///
    /// Per-document failures are reported in the returned [`IngestReport`].
    /// The call itself only fails for invalid chunking parameters or an empty
    /// batch (both before any state change) or an internal fault while
    /// publishing.
    pub async fn ingest(
        &self,
        documents: Vec<Document>,
        chunking: ChunkingConfig,
    ) -> Result<IngestReport> {
        let chunker = TextChunker::from_config(chunking)?;
        if documents.is_empty() {
            return Err(Error::config("ingest requires at least one document"));
        }

        let _writer = self.writer.lock().await;
        let start = Instant::now();

        let previous = {
            let mut state = self.state.write();
            let previous = *state;
            *state = CorpusState::Indexing;
            previous
        };
        let guard = StateGuard {
            state: &self.state,
            restore: previous,
            armed: true,
        };

        let base = self
            .current_index()
            .unwrap_or_else(|| Arc::new(self.indexer.empty_index()));
        let mut known: HashSet<String> = base.document_ids().into_iter().map(String::from).collect();

        tracing::info!(
            documents = documents.len(),
            chunk_size = chunking.chunk_size,
            chunk_overlap = chunking.chunk_overlap,
            "Starting ingest"
        );

        let mut outcomes = Vec::with_capacity(documents.len());
        let mut pending: Vec<(Chunk, Vec<f32>)> = Vec::new();

        for document in documents {
            let document_id = document.id.clone();
            let doc_start = Instant::now();

            let is_new = known.insert(document_id.clone());
            let result = if is_new {
                self.process_with_timeout(document, chunker, base.dimension()).await
            } else {
                Err(Error::config(format!(
                    "document '{}' is already in the corpus",
                    document_id
                )))
            };

            let status = match result {
                Ok(work) => {
                    let chunks_added = work.embedded.len();
                    tracing::info!(
                        filename = %document_id,
                        chunks = chunks_added,
                        skipped = work.skipped.len(),
                        elapsed_ms = doc_start.elapsed().as_millis() as u64,
                        "Document processed"
                    );
                    pending.extend(work.embedded);
                    DocumentStatus::Indexed {
                        chunks_added,
                        skipped_chunks: work.skipped,
                        page_count: work.page_count,
                        empty_text: work.empty_text,
                    }
                }
                Err(e) => {
                    if is_new {
                        known.remove(&document_id);
                    }
                    tracing::warn!(filename = %document_id, error = %e, "Document failed");
                    DocumentStatus::Failed {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }
                }
            };

            outcomes.push(DocumentOutcome {
                document_id,
                status,
            });
        }

        let total_chunks_added = pending.len();
        let any_success = outcomes.iter().any(DocumentOutcome::is_success);

        let final_state = if any_success {
            let next = tokio::task::spawn_blocking(move || base.append(pending))
                .await
                .map_err(|e| Error::internal(format!("index build task failed: {}", e)))??;

            tracing::info!(chunks = next.len(), approximate = next.has_ann(), "Publishing index");
            *self.index.write() = Some(Arc::new(next));
            CorpusState::Ready
        } else {
            tracing::warn!("No document in the batch could be indexed");
            CorpusState::Failed
        };
        guard.finish(final_state);

        let report = IngestReport {
            documents: outcomes,
            total_chunks_added,
            state: final_state,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            chunks = total_chunks_added,
            elapsed_ms = report.processing_time_ms,
            "Ingest finished"
        );
        Ok(report)
    }

    async fn process_with_timeout(
        &self,
        document: Document,
        chunker: TextChunker,
        dimension: Option<usize>,
    ) -> Result<DocumentWork> {
        match self.config.timeouts.document() {
            Some(limit) => {
                let operation = format!("ingest of '{}'", document.id);
                timeout(limit, self.process_document(document, chunker, dimension))
                    .await
                    .map_err(|_| Error::timeout(operation, limit))?
            }
            None => self.process_document(document, chunker, dimension).await,
        }
    }

    /// Extract, chunk and embed one document
    async fn process_document(
        &self,
        document: Document,
        chunker: TextChunker,
        dimension: Option<usize>,
    ) -> Result<DocumentWork> {
        let Document { id, content } = document;

        let extractors = Arc::clone(&self.extractors);
        let filename = id.clone();
        let extracted = tokio::task::spawn_blocking(move || extractors.extract(&filename, &content))
            .await
            .map_err(|e| Error::extraction(&id, format!("extraction task failed: {}", e)))??;

        let empty_text = extracted.is_empty();
        let chunks = chunker.chunk(&extracted.text, &id);
        let chunk_count = chunks.len();

        tracing::debug!(
            filename = %id,
            pages = ?extracted.page_count,
            chunks = chunk_count,
            content_hash = %extracted.content_hash,
            "Extracted and chunked"
        );

        let batch = self.indexer.embed_chunks(chunks, dimension).await;

        if chunk_count > 0 && batch.embedded.is_empty() {
            let reason = batch
                .skipped
                .into_iter()
                .next()
                .map(|s| s.error)
                .unwrap_or_else(|| Error::embedding("no chunk could be embedded"));
            return Err(Error::embedding(format!(
                "all {} chunks failed to embed: {}",
                chunk_count, reason
            )));
        }

        Ok(DocumentWork {
            embedded: batch.embedded,
            skipped: batch
                .skipped
                .into_iter()
                .map(|s| ChunkFailure {
                    sequence: s.chunk.sequence,
                    message: s.error.to_string(),
                })
                .collect(),
            page_count: extracted.page_count,
            empty_text,
        })
    }

    /// Answer a question from the published index
    ///
    /// Bounded by `timeouts.query` when configured.
    pub async fn ask(&self, question: &str, k: usize) -> Result<QueryResult> {
        match self.config.timeouts.query() {
            Some(limit) => self.ask_with_timeout(question, k, limit).await,
            None => self.answer(question, k).await,
        }
    }

    /// [`ask`](Self::ask) with a caller-chosen time bound
    pub async fn ask_with_timeout(
        &self,
        question: &str,
        k: usize,
        limit: Duration,
    ) -> Result<QueryResult> {
        timeout(limit, self.answer(question, k)).await.map_err(|_| {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Query timed out");
            Error::timeout("ask", limit)
        })?
    }

    async fn answer(&self, question: &str, k: usize) -> Result<QueryResult> {
        let start = Instant::now();

        let index = self
            .current_index()
            .ok_or_else(|| Error::NotReady { state: self.state() })?;

        let sources = self.retriever.retrieve(&index, question, k).await?;
        let answer = self.synthesizer.synthesize(question, &sources).await?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            k,
            sources = sources.len(),
            grounded = answer.is_grounded(),
            elapsed_ms = processing_time_ms,
            "Query answered"
        );

        Ok(QueryResult {
            question: question.to_string(),
            answer,
            sources,
            answered_at: Utc::now(),
            processing_time_ms,
        })
    }

    /// Publish a previously saved index, replacing the current one
    pub async fn restore(&self, index: VectorIndex) -> Result<()> {
        let expected = self.indexer.embedder().dimensions();
        if let Some(actual) = index.dimension() {
            if actual != expected {
                return Err(Error::DimensionMismatch { expected, actual });
            }
        }

        let _writer = self.writer.lock().await;
        tracing::info!(chunks = index.len(), "Restoring index");
        *self.index.write() = Some(Arc::new(index));
        *self.state.write() = CorpusState::Ready;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Answer;

    fn manager() -> CorpusManager {
        let embedder = Arc::new(HashingEmbedder::new(128, 2048).unwrap());
        CorpusManager::new(RagConfig::default(), embedder, None).unwrap()
    }

    fn text_doc(name: &str, text: &str) -> Document {
        Document::new(name, text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_ask_before_ingest_is_not_ready() {
        let manager = manager();
        assert_eq!(manager.state(), CorpusState::Empty);
        let err = manager.ask("anything", 3).await.unwrap_err();
        assert!(matches!(err, Error::NotReady { state: CorpusState::Empty }));
    }

    #[tokio::test]
    async fn test_invalid_chunking_rejected_before_state_change() {
        let manager = manager();
        let err = manager
            .ingest(vec![text_doc("a.txt", "hello")], ChunkingConfig::new(10, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(manager.state(), CorpusState::Empty);

        let err = manager
            .ingest(Vec::new(), ChunkingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(manager.state(), CorpusState::Empty);
    }

    #[tokio::test]
    async fn test_duplicate_document_rejected() {
        let manager = manager();
        let chunking = ChunkingConfig::new(50, 10);
        manager
            .ingest(vec![text_doc("a.txt", "cells divide")], chunking)
            .await
            .unwrap();

        let report = manager
            .ingest(
                vec![text_doc("a.txt", "again"), text_doc("b.txt", "atoms bond")],
                chunking,
            )
            .await
            .unwrap();
        assert_eq!(report.success_count(), 1);
        assert!(!report.documents[0].is_success());
        assert_eq!(manager.stats().documents, 2);
    }

    #[tokio::test]
    async fn test_empty_text_document_succeeds_without_chunks() {
        let manager = manager();
        let report = manager
            .ingest(vec![text_doc("blank.txt", "   \n ")], ChunkingConfig::default())
            .await
            .unwrap();

        assert_eq!(report.state, CorpusState::Ready);
        match &report.documents[0].status {
            DocumentStatus::Indexed {
                chunks_added,
                empty_text,
                ..
            } => {
                assert_eq!(*chunks_added, 0);
                assert!(*empty_text);
            }
            other => panic!("unexpected status: {other:?}"),
        }

        let result = manager.ask("anything", 3).await.unwrap();
        assert_eq!(result.answer, Answer::NoRelevantInformation);
    }

    #[tokio::test]
    async fn test_stats_and_restore() {
        let manager = manager();
        manager
            .ingest(
                vec![text_doc("bio.txt", "Mitochondria produce ATP for the cell")],
                ChunkingConfig::default(),
            )
            .await
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.state, CorpusState::Ready);
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.dimension, Some(128));

        let snapshot = manager.current_index().unwrap();
        let other = self::manager();
        other.restore((*snapshot).clone()).await.unwrap();
        assert_eq!(other.stats().chunks, 1);

        let result = other.ask("What produces ATP?", 1).await.unwrap();
        assert_eq!(result.sources[0].chunk.document_id, "bio.txt");
    }
}
