//! Approximate candidate generation backed by `hnsw_rs`
//!
//! The graph only proposes positions. The owning
//! [`VectorIndex`](super::index::VectorIndex) re-scores them exactly, so graph
//! distances never reach a caller.
//!
//! Graph nodes are keyed by index position. Positions are append-only, so one
//! graph can be shared by an index and the indexes extended from it; a reader
//! drops candidates at or beyond its own length.

use hnsw_rs::prelude::{DistCosine, Hnsw};
use parking_lot::Mutex;
use std::fmt;

use crate::config::IndexConfig;

/// `hnsw_rs` layer limit
const MAX_LAYERS: usize = 16;

#[derive(Debug, Default)]
struct Coverage {
    /// Index positions the graph has been offered
    positions: usize,
    /// Nodes actually inserted
    nodes: usize,
}

pub(crate) struct AnnGraph {
    hnsw: Hnsw<'static, f32, DistCosine>,
    coverage: Mutex<Coverage>,
}

impl AnnGraph {
    /// An empty graph sized for roughly `capacity` nodes
    pub fn new(config: &IndexConfig, capacity: usize) -> Self {
        let hnsw = Hnsw::new(
            config.hnsw_m,
            capacity.max(1),
            MAX_LAYERS,
            config.hnsw_ef_construction.max(1),
            DistCosine {},
        );
        Self {
            hnsw,
            coverage: Mutex::new(Coverage::default()),
        }
    }

    /// Offer positions `from..vectors.len()`, inserting those `include` accepts
    ///
    /// Returns `false`, inserting nothing, when the graph does not cover
    /// exactly `from` positions (it was extended by another index).
    pub fn try_extend(
        &self,
        from: usize,
        vectors: &[Vec<f32>],
        include: impl Fn(usize) -> bool,
    ) -> bool {
        let mut coverage = self.coverage.lock();
        if coverage.positions != from {
            return false;
        }
        for (position, vector) in vectors.iter().enumerate().skip(from) {
            if include(position) {
                self.hnsw.insert_slice((vector.as_slice(), position));
                coverage.nodes += 1;
            }
        }
        coverage.positions = vectors.len();
        true
    }

    /// Up to `count` positions near `query`, nearest first
    pub fn candidates(&self, query: &[f32], count: usize, ef: usize) -> Vec<usize> {
        if count == 0 || self.coverage.lock().nodes == 0 {
            return Vec::new();
        }
        self.hnsw
            .search(query, count, ef.max(count))
            .into_iter()
            .map(|neighbour| neighbour.d_id)
            .collect()
    }
}

impl fmt::Debug for AnnGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coverage = self.coverage.lock();
        f.debug_struct("AnnGraph")
            .field("positions", &coverage.positions)
            .field("nodes", &coverage.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let angle = i as f32 * 0.37;
                vec![angle.cos(), angle.sin(), 1.0 + (i % 7) as f32 * 0.1]
            })
            .collect()
    }

    fn config() -> IndexConfig {
        IndexConfig {
            ann_threshold: 1,
            hnsw_m: 8,
            hnsw_ef_construction: 64,
            hnsw_ef_search: 64,
        }
    }

    #[test]
    fn test_candidates_contain_exact_match() {
        let vectors = ring(300);
        let graph = AnnGraph::new(&config(), vectors.len());
        assert!(graph.try_extend(0, &vectors, |_| true));

        for target in [0usize, 17, 150, 299] {
            let found = graph.candidates(&vectors[target], 32, 64);
            assert!(found.contains(&target), "target {target} not in candidates");
        }
    }

    #[test]
    fn test_extend_requires_matching_coverage() {
        let vectors = ring(50);
        let graph = AnnGraph::new(&config(), 64);
        assert!(graph.try_extend(0, &vectors[..30], |_| true));
        assert!(!graph.try_extend(10, &vectors, |_| true));
        assert!(graph.try_extend(30, &vectors, |p| p % 2 == 0));

        let coverage = graph.coverage.lock();
        assert_eq!(coverage.positions, 50);
        assert_eq!(coverage.nodes, 40);
    }

    #[test]
    fn test_empty_graph_yields_nothing() {
        let graph = AnnGraph::new(&config(), 8);
        assert!(graph.try_extend(0, &[vec![0.0, 0.0]], |_| false));
        assert!(graph.candidates(&[1.0, 0.0], 5, 10).is_empty());
    }
}
