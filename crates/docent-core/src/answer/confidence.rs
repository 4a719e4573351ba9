//! Answer confidence scoring

/// Maps reranker relevance scores (descending order) to a confidence
/// value in [0, 1]. Implementations must be monotonic: raising any
/// input score never lowers the output.
pub trait ConfidenceScorer: Send + Sync {
    fn score(&self, relevance: &[f64]) -> f64;
}

/// Default scorer: weighted blend of the top score and the mean of the
/// top three. A single strong source dominates, but corroboration from
/// the rest of the ranking still moves the needle.
pub struct WeightedTopScorer {
    top_weight: f64,
}

impl Default for WeightedTopScorer {
    fn default() -> Self {
        Self { top_weight: 0.7 }
    }
}

impl ConfidenceScorer for WeightedTopScorer {
    fn score(&self, relevance: &[f64]) -> f64 {
        if relevance.is_empty() {
            return 0.0;
        }
        let top = relevance[0];
        let head = &relevance[..relevance.len().min(3)];
        let mean = head.iter().sum::<f64>() / head.len() as f64;
        (self.top_weight * top + (1.0 - self.top_weight) * mean).clamp(0.0, 1.0)
    }
}
