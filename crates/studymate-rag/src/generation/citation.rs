//! Snippet truncation and citation marker parsing

use regex::Regex;
use std::sync::OnceLock;

use crate::types::Citation;

/// Matches `[Source: file.pdf, words 0-500]` and `[Source: file.pdf]`
const CITATION_PATTERN: &str = r"\[Source:\s*([^,\]]+?)\s*(?:,\s*words\s*(\d+)\s*-\s*(\d+))?\s*\]";

fn citation_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(CITATION_PATTERN).ok()).as_ref()
}

/// Indices into `citations` that `answer` refers to with inline markers
///
/// A marker naming only a file matches every citation from that file.
/// Indices are returned in ascending order without duplicates.
pub fn referenced_citations(answer: &str, citations: &[Citation]) -> Vec<usize> {
    let Some(pattern) = citation_regex() else {
        return Vec::new();
    };

    let mut referenced = Vec::new();
    for cap in pattern.captures_iter(answer) {
        let filename = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let range: Option<(usize, usize)> = match (cap.get(2), cap.get(3)) {
            (Some(s), Some(e)) => s.as_str().parse().ok().zip(e.as_str().parse().ok()),
            _ => None,
        };

        for (i, citation) in citations.iter().enumerate() {
            if !citation.filename.eq_ignore_ascii_case(filename) {
                continue;
            }
            let matches = match range {
                Some((start, end)) => {
                    citation.word_range.start == start && citation.word_range.end == end
                }
                None => true,
            };
            if matches && !referenced.contains(&i) {
                referenced.push(i);
            }
        }
    }

    referenced.sort_unstable();
    referenced
}

/// Truncate snippet to at most `max_chars` characters, preserving word boundaries
pub fn truncate_snippet(snippet: &str, max_chars: usize) -> String {
    let Some((end, _)) = snippet.char_indices().nth(max_chars) else {
        return snippet.to_string();
    };

    if let Some(pos) = snippet[..end].rfind(' ') {
        return format!("{}...", &snippet[..pos]);
    }

    format!("{}...", &snippet[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WordRange;

    fn citation(filename: &str, start: usize, end: usize) -> Citation {
        Citation {
            filename: filename.to_string(),
            chunk_index: 0,
            word_range: WordRange { start, end },
            score: 0.5,
            snippet: String::new(),
        }
    }

    #[test]
    fn test_truncate_snippet() {
        let snippet = "This is a very long snippet that needs to be truncated.";
        let truncated = truncate_snippet(snippet, 20);

        assert!(truncated.len() <= 23);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated, "This is a very long...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let snippet = "ééééééééééééééé";
        let truncated = truncate_snippet(snippet, 7);
        assert_eq!(truncated, "ééééééé...");
        assert_eq!(truncate_snippet(snippet, 15), snippet);
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let snippet = vec!["αβγδε"; 100].join(" ");
        let truncated = truncate_snippet(&snippet, 300);

        // 50 whole words and 49 spaces, then the ellipsis
        assert_eq!(truncated.chars().count(), 5 * 50 + 49 + 3);
        assert!(truncated.ends_with("αβγδε..."));
    }

    #[test]
    fn test_referenced_citations() {
        let citations = vec![
            citation("ml.pdf", 0, 500),
            citation("ml.pdf", 400, 900),
            citation("bio.pdf", 0, 120),
        ];

        let answer = "Overfitting memorizes noise [Source: ml.pdf, words 400-900].";
        assert_eq!(referenced_citations(answer, &citations), vec![1]);

        let answer = "See [Source: BIO.pdf] and [Source: ml.pdf, words 0-500].";
        assert_eq!(referenced_citations(answer, &citations), vec![0, 2]);

        assert!(referenced_citations("no markers here", &citations).is_empty());
    }
}
