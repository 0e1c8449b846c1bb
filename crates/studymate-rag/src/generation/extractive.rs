//! Extractive answers: verbatim sentences from the retrieved chunks

use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::providers::hashing::content_terms;
use crate::types::RankedChunk;

/// A sentence candidate with its position in the retrieved context
#[derive(Debug)]
struct Span<'a> {
    text: &'a str,
    rank: usize,
    offset: usize,
    score: f32,
}

/// Picks the sentences that share the most content words with the question
#[derive(Debug, Clone, Copy)]
pub struct ExtractiveSynthesizer {
    max_sentences: usize,
}

impl ExtractiveSynthesizer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }

    /// Select spans for `question`
    ///
    /// Sentences are scored by distinct question terms they contain, weighted
    /// by their chunk's similarity. The best ones are returned verbatim in
    /// context order, joined by a single space. `None` when no sentence
    /// shares a term with the question.
    pub fn extract(&self, question: &str, ranked: &[RankedChunk]) -> Option<String> {
        let question_terms: HashSet<String> = content_terms(question).collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut spans: Vec<Span<'_>> = Vec::new();

        for (rank, item) in ranked.iter().enumerate() {
            let weight = 1.0 + item.score.max(0.0);
            for (offset, sentence) in item.chunk.text.split_sentence_bounds().enumerate() {
                let sentence = sentence.trim();
                // Overlapping chunks repeat sentences
                if sentence.is_empty() || !seen.insert(sentence) {
                    continue;
                }

                let overlap = content_terms(sentence)
                    .filter(|t| question_terms.contains(t))
                    .collect::<HashSet<_>>()
                    .len();

                spans.push(Span {
                    text: sentence,
                    rank,
                    offset,
                    score: overlap as f32 * weight,
                });
            }
        }

        let mut best: Vec<&Span<'_>> = spans.iter().filter(|s| s.score > 0.0).collect();
        if best.is_empty() {
            return None;
        }

        best.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.rank.cmp(&b.rank))
                .then(a.offset.cmp(&b.offset))
        });
        best.truncate(self.max_sentences);
        best.sort_by_key(|s| (s.rank, s.offset));

        Some(best.iter().map(|s| s.text).collect::<Vec<_>>().join(" "))
    }
}
