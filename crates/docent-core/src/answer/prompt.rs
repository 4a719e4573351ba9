//! Deterministic prompt assembly
//!
//! Sources appear in reranked order, each tagged [S1]..[Sn]. The total
//! context is held under a word budget by dropping the lowest-ranked
//! chunks first; the question and instructions are never truncated.

use crate::search::RerankedCandidate;

const SYSTEM_PROMPT: &str = "You are a research assistant answering questions \
about a private laboratory document corpus. Answer using ONLY the numbered \
sources provided. Cite every claim with its source marker, e.g. [S1]. If the \
sources do not contain the answer, say so plainly instead of guessing.";

/// A chunk included in the prompt, addressable by its citation marker
#[derive(Debug, Clone)]
pub struct PromptSource {
    /// Marker without brackets, e.g. "S1"
    pub marker: String,
    pub doc_id: i64,
    pub chunk_index: i64,
    pub doc_title: String,
    pub chapter: Option<String>,
}

/// Assembled prompt plus the source table citations resolve against
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
    pub sources: Vec<PromptSource>,
}

/// Build the generation prompt from reranked candidates.
///
/// Identical inputs produce byte-identical output. If the combined
/// source text exceeds `budget_words`, whole chunks are dropped from
/// the tail of the ranking until it fits; the best-ranked chunk is
/// always kept.
pub fn build_prompt(
    query: &str,
    reranked: &[RerankedCandidate],
    budget_words: usize,
) -> BuiltPrompt {
    let mut kept = reranked.len();
    while kept > 1 {
        let total: usize = reranked[..kept]
            .iter()
            .map(|r| r.candidate.text.split_whitespace().count())
            .sum();
        if total <= budget_words {
            break;
        }
        kept -= 1;
    }

    let mut sources = Vec::with_capacity(kept);
    let mut context = String::new();
    for (i, r) in reranked[..kept].iter().enumerate() {
        let marker = format!("S{}", i + 1);
        let heading = match &r.candidate.chapter {
            Some(chapter) => format!(
                "[{marker}] {} ({})",
                r.candidate.doc_title, chapter
            ),
            None => format!("[{marker}] {}", r.candidate.doc_title),
        };
        context.push_str(&heading);
        context.push('\n');
        context.push_str(&r.candidate.text);
        context.push_str("\n\n");
        sources.push(PromptSource {
            marker,
            doc_id: r.candidate.doc_id,
            chunk_index: r.candidate.chunk_index,
            doc_title: r.candidate.doc_title.clone(),
            chapter: r.candidate.chapter.clone(),
        });
    }

    let user = format!("Sources:\n\n{context}Question: {query}");

    BuiltPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DocType;
    use crate::search::RetrievalCandidate;

    fn reranked(doc_id: i64, title: &str, text: &str, relevance: f64) -> RerankedCandidate {
        RerankedCandidate {
            candidate: RetrievalCandidate {
                doc_id,
                chunk_index: 0,
                doc_title: title.into(),
                doc_type: DocType::Protocol,
                author: "lab".into(),
                year: 2024,
                chapter: None,
                text: text.into(),
                dense_score: relevance,
                lexical_score: relevance,
                combined_score: relevance,
            },
            relevance,
        }
    }

    #[test]
    fn test_sources_tagged_in_rank_order() {
        let candidates = vec![
            reranked(1, "PCR", "annealing at 55C", 0.9),
            reranked(2, "Gels", "agarose at 1 percent", 0.5),
        ];
        let prompt = build_prompt("what temperature?", &candidates, 1000);

        assert_eq!(prompt.sources.len(), 2);
        assert_eq!(prompt.sources[0].marker, "S1");
        assert_eq!(prompt.sources[0].doc_id, 1);
        assert_eq!(prompt.sources[1].marker, "S2");
        assert!(prompt.user.contains("[S1] PCR"));
        assert!(prompt.user.contains("[S2] Gels"));
        assert!(prompt.user.contains("Question: what temperature?"));
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let candidates = vec![reranked(1, "PCR", "annealing at 55C", 0.9)];
        let a = build_prompt("q", &candidates, 1000);
        let b = build_prompt("q", &candidates, 1000);
        assert_eq!(a.system, b.system);
        assert_eq!(a.user, b.user);
    }

    #[test]
    fn test_budget_drops_lowest_ranked_first() {
        let long = "word ".repeat(600);
        let candidates = vec![
            reranked(1, "Top", &long, 0.9),
            reranked(2, "Mid", &long, 0.7),
            reranked(3, "Low", &long, 0.5),
        ];
        let prompt = build_prompt("q", &candidates, 1300);

        assert_eq!(prompt.sources.len(), 2);
        assert_eq!(prompt.sources[0].doc_id, 1);
        assert_eq!(prompt.sources[1].doc_id, 2);
        assert!(!prompt.user.contains("[S3]"));
        // Question survives truncation
        assert!(prompt.user.contains("Question: q"));
    }

    #[test]
    fn test_best_chunk_always_kept() {
        let huge = "word ".repeat(5000);
        let candidates = vec![reranked(1, "Only", &huge, 0.9)];
        let prompt = build_prompt("q", &candidates, 100);
        assert_eq!(prompt.sources.len(), 1);
    }
}
