//! Embedding indexer and the immutable vector index it produces
//!
//! A [`VectorIndex`] is never mutated after construction. Extending it yields
//! a new index, so the corpus can publish the result with a single pointer
//! swap while readers keep using the old one.
//!
//! Large indexes take candidates from an HNSW graph and re-score them exactly.
//! Vectors pointing the same way share one graph node and are expanded back
//! to every position, and zero vectors are always candidates, so ties keep
//! insertion order. Too few candidates falls back to the exact scan.

use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::config::{EmbeddingConfig, IndexConfig};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, RankedChunk};

use super::hnsw::AnnGraph;

const SNAPSHOT_VERSION: u32 = 1;

/// Euclidean norm
fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity given precomputed norms; zero vectors score 0
fn cosine_similarity(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Unit-vector component, with `-0.0` folded into `0.0`
fn unit_component(x: f32, norm: f32) -> u32 {
    let c = x / norm;
    if c == 0.0 {
        0
    } else {
        c.to_bits()
    }
}

fn direction_key(v: &[f32], norm: f32) -> u64 {
    let mut hasher = DefaultHasher::new();
    for &x in v {
        unit_component(x, norm).hash(&mut hasher);
    }
    hasher.finish()
}

fn same_direction(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(&x, &y)| unit_component(x, norm_a) == unit_component(y, norm_b))
}

/// Nearest-neighbor index over (chunk, embedding) pairs in insertion order
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    dimension: Option<usize>,
    config: IndexConfig,
    /// First position sharing each position's direction
    canonical: Vec<usize>,
    /// Every position of a direction held by two or more vectors
    duplicates: HashMap<usize, Vec<usize>>,
    /// Direction hash to the canonical positions carrying it
    directions: HashMap<u64, Vec<usize>>,
    zero_norm: Vec<usize>,
    ann: Option<Arc<AnnGraph>>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    dimension: Option<usize>,
    chunks: &'a [Chunk],
    vectors: &'a [Vec<f32>],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    dimension: Option<usize>,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// An index with no entries
    pub fn empty(config: IndexConfig) -> Self {
        Self {
            chunks: Vec::new(),
            vectors: Vec::new(),
            norms: Vec::new(),
            dimension: None,
            config,
            canonical: Vec::new(),
            duplicates: HashMap::new(),
            directions: HashMap::new(),
            zero_norm: Vec::new(),
            ann: None,
        }
    }

    /// Build an index from embedded chunks
    pub fn from_embedded(config: IndexConfig, embedded: Vec<(Chunk, Vec<f32>)>) -> Result<Self> {
        Self::empty(config).append(embedded)
    }

    /// A new index holding this index's entries followed by `embedded`
    pub fn append(&self, embedded: Vec<(Chunk, Vec<f32>)>) -> Result<Self> {
        let mut next = self.clone();
        let first_new = next.vectors.len();

        for (chunk, vector) in embedded {
            if vector.is_empty() {
                return Err(Error::embedding(format!(
                    "empty embedding for {}",
                    chunk.format_source()
                )));
            }
            match next.dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
                None => next.dimension = Some(vector.len()),
            }
            let norm = magnitude(&vector);
            next.track_direction(&vector, norm);
            next.norms.push(norm);
            next.vectors.push(vector);
            next.chunks.push(chunk);
        }

        next.update_ann(first_new);
        Ok(next)
    }

    /// Record the direction group of the vector about to be pushed
    fn track_direction(&mut self, vector: &[f32], norm: f32) {
        let position = self.vectors.len();
        if norm == 0.0 {
            self.zero_norm.push(position);
            self.canonical.push(position);
            return;
        }

        let key = direction_key(vector, norm);
        let existing = self.directions.get(&key).and_then(|positions| {
            positions
                .iter()
                .copied()
                .find(|&c| same_direction(&self.vectors[c], self.norms[c], vector, norm))
        });

        match existing {
            Some(c) => {
                self.canonical.push(c);
                self.duplicates
                    .entry(c)
                    .or_insert_with(|| vec![c])
                    .push(position);
            }
            None => {
                self.canonical.push(position);
                self.directions.entry(key).or_default().push(position);
            }
        }
    }

    fn update_ann(&mut self, first_new: usize) {
        if self.vectors.len() < self.config.ann_threshold {
            self.ann = None;
            return;
        }

        let canonical = &self.canonical;
        let norms = &self.norms;
        let include = |p: usize| canonical[p] == p && norms[p] > 0.0;

        if let Some(graph) = &self.ann {
            if graph.try_extend(first_new, &self.vectors, include) {
                return;
            }
        }

        tracing::info!(vectors = self.vectors.len(), "Building HNSW graph");
        let graph = AnnGraph::new(&self.config, self.vectors.len() * 2);
        graph.try_extend(0, &self.vectors, include);
        self.ann = Some(Arc::new(graph));
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension, fixed by the first vector inserted
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Whether queries go through the HNSW graph
    pub fn has_ann(&self) -> bool {
        self.ann.is_some()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Distinct document identifiers in ingestion order
    pub fn document_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for chunk in &self.chunks {
            if !ids.contains(&chunk.document_id.as_str()) {
                ids.push(&chunk.document_id);
            }
        }
        ids
    }

    pub fn contains_document(&self, document_id: &str) -> bool {
        self.chunks.iter().any(|c| c.document_id == document_id)
    }

    /// The `k` entries most similar to `query`, best first
    ///
    /// Ties are broken by insertion position. An empty index yields no results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RankedChunk>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = magnitude(query);
        let mut scored: Vec<(usize, f32)> = match self.ann_candidates(query, query_norm, k) {
            Some(positions) => positions
                .into_iter()
                .map(|p| (p, self.score(p, query, query_norm)))
                .collect(),
            None => (0..self.len())
                .into_par_iter()
                .map(|p| (p, self.score(p, query, query_norm)))
                .collect(),
        };

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| RankedChunk {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect())
    }

    /// Graph candidates expanded to every position they stand for
    ///
    /// `None` means the exact scan should be used instead.
    fn ann_candidates(&self, query: &[f32], query_norm: f32, k: usize) -> Option<Vec<usize>> {
        let graph = self.ann.as_ref()?;
        if k >= self.len() || query_norm == 0.0 {
            return None;
        }

        let ef = self.config.hnsw_ef_search.max(k);
        let mut positions = Vec::with_capacity(ef + self.zero_norm.len());
        for c in graph.candidates(query, ef, ef) {
            // Added to the shared graph by a later index
            if c >= self.len() {
                continue;
            }
            match self.duplicates.get(&c) {
                Some(group) => positions.extend_from_slice(group),
                None => positions.push(c),
            }
        }
        positions.extend_from_slice(&self.zero_norm);

        if positions.len() < k {
            tracing::debug!(
                candidates = positions.len(),
                k,
                "Too few graph candidates, scoring exactly"
            );
            return None;
        }
        Some(positions)
    }

    fn score(&self, position: usize, query: &[f32], query_norm: f32) -> f32 {
        cosine_similarity(&self.vectors[position], query, self.norms[position], query_norm)
    }

    /// Write a JSON snapshot of the entries
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            dimension: self.dimension,
            chunks: &self.chunks,
            vectors: &self.vectors,
        };
        let mut writer = BufWriter::new(std::fs::File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a snapshot written by [`save`](Self::save)
    ///
    /// The HNSW graph is rebuilt from the loaded vectors.
    pub fn load(path: impl AsRef<Path>, config: IndexConfig) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_reader(std::io::BufReader::new(file))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::config(format!(
                "unsupported index snapshot version {}",
                snapshot.version
            )));
        }
        if snapshot.chunks.len() != snapshot.vectors.len() {
            return Err(Error::internal(format!(
                "snapshot has {} chunks but {} vectors",
                snapshot.chunks.len(),
                snapshot.vectors.len()
            )));
        }

        let index = Self::from_embedded(
            config,
            snapshot.chunks.into_iter().zip(snapshot.vectors).collect(),
        )?;
        if let (Some(expected), Some(actual)) = (snapshot.dimension, index.dimension) {
            if expected != actual {
                return Err(Error::DimensionMismatch { expected, actual });
            }
        }
        Ok(index)
    }
}

/// A chunk left out of the index, with the reason
#[derive(Debug)]
pub struct SkippedChunk {
    pub chunk: Chunk,
    pub error: Error,
}

/// Chunks embedded for one batch
#[derive(Debug, Default)]
pub struct EmbeddedChunks {
    /// Successfully embedded chunks, in input order
    pub embedded: Vec<(Chunk, Vec<f32>)>,
    pub skipped: Vec<SkippedChunk>,
}

/// Result of [`EmbeddingIndexer::build`] and [`EmbeddingIndexer::extend`]
#[derive(Debug)]
pub struct IndexBuild {
    pub index: VectorIndex,
    pub skipped: Vec<SkippedChunk>,
}

/// Computes chunk embeddings and assembles indexes
#[derive(Clone)]
pub struct EmbeddingIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    parallelism: usize,
    index_config: IndexConfig,
}

impl EmbeddingIndexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        embeddings: &EmbeddingConfig,
        index_config: IndexConfig,
    ) -> Self {
        Self {
            embedder,
            parallelism: embeddings.parallel_embeddings.max(1),
            index_config,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index_config(&self) -> &IndexConfig {
        &self.index_config
    }

    /// An index with no entries, configured like the ones this indexer builds
    pub fn empty_index(&self) -> VectorIndex {
        VectorIndex::empty(self.index_config.clone())
    }

    /// Embed chunks, skipping the ones that fail
    ///
    /// Vectors whose length differs from `expected_dimension` (or from the
    /// embedder's own dimension when `None`) are skipped as well.
    pub async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
        expected_dimension: Option<usize>,
    ) -> EmbeddedChunks {
        let expected = expected_dimension.unwrap_or_else(|| self.embedder.dimensions());

        let results: Vec<(Chunk, Result<Vec<f32>>)> = stream::iter(chunks)
            .map(|chunk| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    let result = embedder.embed(&chunk.text).await;
                    (chunk, result)
                }
            })
            .buffered(self.parallelism)
            .collect()
            .await;

        let mut out = EmbeddedChunks::default();
        for (chunk, result) in results {
            let result = result.and_then(|vector| {
                if vector.len() == expected {
                    Ok(vector)
                } else {
                    Err(Error::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    })
                }
            });

            match result {
                Ok(vector) => out.embedded.push((chunk, vector)),
                Err(error) => {
                    tracing::warn!(
                        chunk = %chunk.format_source(),
                        error = %error,
                        "Skipping chunk that could not be embedded"
                    );
                    out.skipped.push(SkippedChunk { chunk, error });
                }
            }
        }
        out
    }

    /// Build a fresh index over `chunks`
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<IndexBuild> {
        self.extend(&self.empty_index(), chunks).await
    }

    /// A new index holding `index`'s entries followed by `chunks`
    pub async fn extend(&self, index: &VectorIndex, chunks: Vec<Chunk>) -> Result<IndexBuild> {
        let batch = self.embed_chunks(chunks, index.dimension()).await;
        Ok(IndexBuild {
            index: index.append(batch.embedded)?,
            skipped: batch.skipped,
        })
    }
}
