//! Weighted dense/lexical blending

use super::{RetrievalCandidate, SearchFilters};
use crate::db::Database;
use crate::error::Result;
use std::collections::HashMap;

/// Over-fetch factor per signal before blending
const FETCH_FACTOR: usize = 3;

/// Hybrid search: fetch both signals, blend with the configured weight,
/// order by combined score with a deterministic (doc id, chunk index)
/// tie-break, return at most `k`.
///
/// A candidate seen by only one signal keeps a zero score on the other:
/// agreement between signals is rewarded, not required.
pub fn hybrid_search(
    db: &Database,
    query_vector: &[f32],
    query_text: &str,
    model: &str,
    k: usize,
    blend_weight: f64,
    filters: &SearchFilters,
) -> Result<Vec<RetrievalCandidate>> {
    let fetch = k.max(1) * FETCH_FACTOR;
    let dense = db.search_dense(query_vector, model, fetch, filters)?;
    let lexical = db.search_lexical(query_text, fetch, filters)?;

    let mut merged: HashMap<(i64, i64), RetrievalCandidate> = HashMap::new();

    for candidate in dense {
        merged.insert((candidate.doc_id, candidate.chunk_index), candidate);
    }
    for candidate in lexical {
        let key = (candidate.doc_id, candidate.chunk_index);
        match merged.get_mut(&key) {
            Some(existing) => existing.lexical_score = candidate.lexical_score,
            None => {
                merged.insert(key, candidate);
            }
        }
    }

    let mut results: Vec<RetrievalCandidate> = merged
        .into_values()
        .map(|mut c| {
            c.combined_score =
                blend_weight * c.dense_score + (1.0 - blend_weight) * c.lexical_score;
            c
        })
        .collect();

    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    results.truncate(k);

    Ok(results)
}
