//! Trait seams for external model services

use crate::error::Result;
use async_trait::async_trait;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat completion trait, the generation seam
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(&self, messages: Vec<super::ChatMessage>) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Cross-encoder relevance scoring trait.
///
/// Scores all (query, document) pairs in one batched pass; one call per
/// candidate set, never one call per candidate.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score documents for a query, in input order
    async fn score(&self, query: &str, documents: &[ScoredDocument]) -> Result<Vec<f64>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Document handed to the reranker
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub id: String,
    pub text: String,
}
