//! Model provider integration
//!
//! HTTP clients for OpenAI-compatible inference services (vLLM,
//! llama.cpp server, hosted APIs) behind trait seams so the pipeline
//! and its tests never depend on a live service.

mod client;
mod generation;
mod reranker;
mod traits;

pub use client::{ChatMessage, HttpLlmClient};
pub use generation::{GenerationOutput, GenerationTier, TieredGenerator};
pub use reranker::HttpReranker;
pub use traits::{Embedder, LlmClient, Reranker, ScoredDocument};
