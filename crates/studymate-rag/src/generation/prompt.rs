//! Prompt templates for grounded generation

use crate::types::RankedChunk;

/// A retrieved chunk as it appears in a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPassage {
    /// `file.pdf, words 0-500`
    pub source: String,
    pub text: String,
    /// Words were cut to fit the budget
    pub truncated: bool,
}

/// Prompt builder with a bounded context budget
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    context_budget_words: usize,
}

impl PromptBuilder {
    pub fn new(context_budget_words: usize) -> Self {
        Self {
            context_budget_words,
        }
    }

    pub fn context_budget_words(&self) -> usize {
        self.context_budget_words
    }

    /// Fit retrieved chunks into the word budget
    ///
    /// Chunks are taken best score first. The first chunk that does not fit is
    /// cut to the remaining budget and everything ranked below it is dropped.
    pub fn select_context(&self, ranked: &[RankedChunk]) -> Vec<ContextPassage> {
        let mut order: Vec<&RankedChunk> = ranked.iter().collect();
        order.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut remaining = self.context_budget_words;
        let mut passages = Vec::new();

        for item in order {
            if remaining == 0 {
                break;
            }

            let words: Vec<&str> = item.chunk.text.split_whitespace().collect();
            let take = words.len().min(remaining);
            remaining -= take;

            passages.push(ContextPassage {
                source: item.chunk.format_source(),
                text: words[..take].join(" "),
                truncated: take < words.len(),
            });
        }

        let dropped = ranked.len() - passages.len();
        if dropped > 0 || passages.iter().any(|p| p.truncated) {
            tracing::debug!(
                budget = self.context_budget_words,
                dropped,
                "Context trimmed to fit the word budget"
            );
        }

        passages
    }

    /// Build context block from passages
    pub fn build_context(passages: &[ContextPassage]) -> String {
        let mut context = String::new();
        for (i, passage) in passages.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                passage.source,
                passage.text
            ));
        }
        context
    }

    /// Build the grounded RAG prompt
    pub fn grounded_prompt(&self, question: &str, ranked: &[RankedChunk]) -> String {
        let passages = self.select_context(ranked);
        format!(
            r#"You are a study assistant that answers ONLY from the provided course material.

RULES:
1. Use only information explicitly stated in the CONTEXT below
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. Do not use outside knowledge
4. Cite each claim inline as [Source: filename, words X-Y]

CONTEXT FROM DOCUMENTS:
{context}
QUESTION: {question}

Answer using only the context above:"#,
            context = Self::build_context(&passages),
            question = question
        )
    }

    /// Build a tutoring-style prompt that still stays grounded
    pub fn conversational_prompt(&self, question: &str, ranked: &[RankedChunk]) -> String {
        let passages = self.select_context(ranked);
        format!(
            r#"You are a friendly tutor helping a student review their own notes.
Explain the answer conversationally, as you would to the student in person, but
rely only on the notes below. If the notes do not cover the question, say so.
Cite the notes you use as [Source: filename, words X-Y].

STUDENT NOTES:
{context}
STUDENT: {question}

TUTOR:"#,
            context = Self::build_context(&passages),
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, WordRange};

    fn ranked(sequence: u32, words: usize, score: f32) -> RankedChunk {
        let text = (0..words).map(|i| format!("s{}w{}", sequence, i)).collect::<Vec<_>>().join(" ");
        RankedChunk {
            chunk: Chunk {
                document_id: "notes.pdf".to_string(),
                sequence,
                text,
                words: WordRange { start: 0, end: words },
            },
            score,
        }
    }

    #[test]
    fn test_everything_fits() {
        let builder = PromptBuilder::new(100);
        let passages = builder.select_context(&[ranked(0, 10, 0.9), ranked(1, 10, 0.5)]);
        assert_eq!(passages.len(), 2);
        assert!(passages.iter().all(|p| !p.truncated));
    }

    #[test]
    fn test_lowest_score_dropped_first() {
        let builder = PromptBuilder::new(25);
        // Deliberately out of rank order
        let passages = builder.select_context(&[
            ranked(0, 10, 0.2),
            ranked(1, 10, 0.9),
            ranked(2, 10, 0.6),
        ]);

        assert_eq!(passages.len(), 3);
        assert!(passages[0].text.starts_with("s1w0"));
        assert!(passages[1].text.starts_with("s2w0"));
        assert!(!passages[1].truncated);
        assert!(passages[2].truncated);
        assert_eq!(passages[2].text.split(' ').count(), 5);

        let builder = PromptBuilder::new(20);
        let passages = builder.select_context(&[ranked(0, 10, 0.2), ranked(1, 10, 0.9), ranked(2, 10, 0.6)]);
        assert_eq!(passages.len(), 2);
        assert!(passages.iter().all(|p| !p.text.starts_with("s0")));
    }

    #[test]
    fn test_prompt_contains_question_and_sources() {
        let builder = PromptBuilder::new(100);
        let prompt = builder.grounded_prompt("What is s0w1?", &[ranked(0, 3, 0.9)]);
        assert!(prompt.contains("QUESTION: What is s0w1?"));
        assert!(prompt.contains("[1] notes.pdf, words 0-3"));
        assert!(prompt.contains("s0w0 s0w1 s0w2"));

        let prompt = builder.conversational_prompt("Explain s0w1", &[ranked(0, 3, 0.9)]);
        assert!(prompt.contains("STUDENT: Explain s0w1"));
    }
}
