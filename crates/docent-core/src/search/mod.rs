//! Hybrid retrieval
//!
//! Provides:
//! - BM25 full-text search via FTS5 (lexical signal)
//! - cosine similarity over cached chunk vectors (dense signal)
//! - weighted blending with deterministic ordering
//! Only documents whose ingestion completed are visible to any of it.

mod hybrid;
mod lexical;
mod retriever;
mod vector;

pub use hybrid::hybrid_search;
pub use retriever::Retriever;

use crate::db::DocType;

/// Attribute filters applied inside search SQL
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub doc_type: Option<DocType>,
    pub author: Option<String>,
    pub year: Option<i32>,
}

impl SearchFilters {
    pub fn for_doc_type(doc_type: Option<DocType>) -> Self {
        Self {
            doc_type,
            ..Self::default()
        }
    }
}

/// First-pass retrieval candidate
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub doc_id: i64,
    pub chunk_index: i64,
    pub doc_title: String,
    pub doc_type: DocType,
    pub author: String,
    pub year: i32,
    pub chapter: Option<String>,
    pub text: String,
    /// Cosine similarity, clamped to [0, 1]
    pub dense_score: f64,
    /// Normalized BM25 score in [0, 1]
    pub lexical_score: f64,
    /// Blended score the candidate set is ordered by
    pub combined_score: f64,
}

/// Candidate after cross-encoder rescoring
#[derive(Debug, Clone)]
pub struct RerankedCandidate {
    pub candidate: RetrievalCandidate,
    pub relevance: f64,
}

/// Relevance assumed for candidates a reranker returned no score for
const NEUTRAL_RELEVANCE: f64 = 0.5;

/// Rescore candidates and order them strictly descending by relevance.
///
/// The sort is stable, so ties keep their original retrieval rank. The
/// output is always a permutation of a prefix-truncation of the input.
/// A score array shorter than the candidate set never drops candidates;
/// the unscored tail gets a neutral score instead.
pub fn apply_rerank_scores(
    candidates: Vec<RetrievalCandidate>,
    scores: &[f64],
    top_n: usize,
) -> Vec<RerankedCandidate> {
    let mut reranked: Vec<RerankedCandidate> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| RerankedCandidate {
            relevance: scores.get(i).copied().unwrap_or(NEUTRAL_RELEVANCE),
            candidate,
        })
        .collect();

    reranked.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    reranked.truncate(top_n);
    reranked
}

/// Common English stop words removed from natural language queries
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "does", "do",
    "did", "can", "could", "should", "would", "what", "where", "when", "why", "how", "who",
    "which", "this", "these", "those", "there", "here",
];

/// Sanitize a natural-language query for FTS5 to prevent syntax errors.
/// Removes stop words and FTS5 operator characters.
pub fn sanitize_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '^' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ':' | '*'))
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(doc_id: i64, chunk_index: i64, combined: f64) -> RetrievalCandidate {
        RetrievalCandidate {
            doc_id,
            chunk_index,
            doc_title: "doc".into(),
            doc_type: DocType::Paper,
            author: "a".into(),
            year: 2024,
            chapter: None,
            text: "text".into(),
            dense_score: combined,
            lexical_score: combined,
            combined_score: combined,
        }
    }

    #[test]
    fn test_sanitize_strips_operators_and_stop_words() {
        assert_eq!(
            sanitize_fts_query("what is the annealing temperature?"),
            "annealing temperature"
        );
        assert_eq!(sanitize_fts_query("buffer (pH 7.4)"), "buffer pH 7.4");
    }

    #[test]
    fn test_rerank_orders_descending() {
        let candidates = vec![candidate(1, 0, 0.9), candidate(2, 0, 0.8), candidate(3, 0, 0.7)];
        let reranked = apply_rerank_scores(candidates, &[0.1, 0.9, 0.5], 3);
        assert_eq!(reranked[0].candidate.doc_id, 2);
        assert_eq!(reranked[1].candidate.doc_id, 3);
        assert_eq!(reranked[2].candidate.doc_id, 1);
    }

    #[test]
    fn test_rerank_ties_keep_retrieval_order() {
        let candidates = vec![candidate(1, 0, 0.9), candidate(2, 0, 0.8), candidate(3, 0, 0.7)];
        let reranked = apply_rerank_scores(candidates, &[0.5, 0.5, 0.5], 3);
        let ids: Vec<i64> = reranked.iter().map(|r| r.candidate.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rerank_short_score_array_keeps_all_candidates() {
        let candidates = vec![candidate(1, 0, 0.9), candidate(2, 0, 0.8), candidate(3, 0, 0.7)];
        let reranked = apply_rerank_scores(candidates, &[0.9], 3);
        assert_eq!(reranked.len(), 3);
        // Unscored candidates rank neutrally, behind the scored one
        assert_eq!(reranked[0].candidate.doc_id, 1);
        assert_eq!(reranked[1].relevance, 0.5);
        assert_eq!(reranked[2].relevance, 0.5);
    }

    #[test]
    fn test_rerank_is_permutation_of_input_prefix() {
        let candidates: Vec<_> = (0..5).map(|i| candidate(i, 0, 0.5)).collect();
        let reranked = apply_rerank_scores(candidates, &[0.2, 0.9, 0.4, 0.8, 0.1], 3);
        let mut ids: Vec<i64> = reranked.iter().map(|r| r.candidate.doc_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
