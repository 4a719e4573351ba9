//! Configuration management
//!
//! Loaded once at startup from a YAML file with `DOCENT_*` environment
//! overrides, then validated. Invalid values fail fast rather than
//! surfacing at request time.

use crate::error::{DocentError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chunking policy
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Answer gating
    #[serde(default)]
    pub answer: AnswerConfig,

    /// Primary generation/embedding service
    #[serde(default)]
    pub llm: LlmServiceConfig,

    /// Fallback generation service (smaller/local model)
    #[serde(default = "LlmServiceConfig::default_fallback")]
    pub fallback_llm: LlmServiceConfig,

    /// Ingestion worker count
    #[serde(default = "default_workers")]
    pub ingest_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            answer: AnswerConfig::default(),
            llm: LlmServiceConfig::default(),
            fallback_llm: LlmServiceConfig::default_fallback(),
            ingest_workers: default_workers(),
        }
    }
}

/// Chunking policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in words
    #[serde(default = "default_chunk_words")]
    pub target_words: usize,

    /// Allowed deviation from the target when snapping to sentence ends
    #[serde(default = "default_chunk_tolerance")]
    pub tolerance_words: usize,

    /// Overlap with the preceding chunk in words
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_words: default_chunk_words(),
            tolerance_words: default_chunk_tolerance(),
            overlap_words: default_overlap_words(),
        }
    }
}

/// Retrieval tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched by hybrid search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Reranked candidates kept for prompt construction
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Dense/lexical blend: 1.0 = pure vector, 0.0 = pure keyword
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,

    /// Combined-score floor below which candidates are discarded
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            top_n: default_top_n(),
            blend_weight: default_blend_weight(),
            similarity_floor: default_similarity_floor(),
        }
    }
}

/// Answer gating and deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Confidence below this flags the answer as low_confidence
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Prompt context budget in words
    #[serde(default = "default_context_budget")]
    pub context_budget_words: usize,

    /// Soft generation timeout: primary tier is abandoned after this
    #[serde(default = "default_soft_timeout")]
    pub generation_soft_timeout_secs: u64,

    /// Hard generation timeout: fallback tier is abandoned after this
    #[serde(default = "default_hard_timeout")]
    pub generation_hard_timeout_secs: u64,

    /// Overall per-query deadline
    #[serde(default = "default_query_deadline")]
    pub query_deadline_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            context_budget_words: default_context_budget(),
            generation_soft_timeout_secs: default_soft_timeout(),
            generation_hard_timeout_secs: default_hard_timeout(),
            query_deadline_secs: default_query_deadline(),
        }
    }
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmServiceConfig {
    /// Base URL of the service (OpenAI-compatible)
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings (falls back to `url` if unset)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default = "default_embedding_dims")]
    pub embedding_dimensions: usize,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl LlmServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    fn default_fallback() -> Self {
        Self {
            url: std::env::var("DOCENT_FALLBACK_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            model: std::env::var("DOCENT_FALLBACK_LLM_MODEL")
                .unwrap_or_else(|_| "Qwen/Qwen2.5-3B-Instruct".to_string()),
            embedding_url: None,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dims(),
            api_key: std::env::var("DOCENT_FALLBACK_LLM_API_KEY").ok(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LlmServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DOCENT_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("DOCENT_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("DOCENT_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_embedding_dims),
            api_key: std::env::var("DOCENT_LLM_API_KEY").ok(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("DOCENT_LLM_MODEL")
        .unwrap_or_else(|_| "meta-llama/Llama-3.1-8B-Instruct".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("DOCENT_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_embedding_dims() -> usize {
    384
}

fn default_request_timeout() -> u64 {
    30
}

fn default_chunk_words() -> usize {
    400
}

fn default_chunk_tolerance() -> usize {
    50
}

fn default_overlap_words() -> usize {
    100
}

fn default_top_k() -> usize {
    10
}

fn default_top_n() -> usize {
    3
}

fn default_blend_weight() -> f64 {
    0.7
}

fn default_similarity_floor() -> f64 {
    0.25
}

fn default_confidence_threshold() -> f64 {
    0.45
}

fn default_context_budget() -> usize {
    1600
}

fn default_soft_timeout() -> u64 {
    5
}

fn default_hard_timeout() -> u64 {
    15
}

fn default_query_deadline() -> u64 {
    10
}

fn default_workers() -> usize {
    2
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults if absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Validate all tunable values; called once at startup
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.retrieval.blend_weight) {
            return Err(DocentError::Config(format!(
                "blend_weight must be in [0, 1], got {}",
                self.retrieval.blend_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.answer.confidence_threshold) {
            return Err(DocentError::Config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.answer.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_floor) {
            return Err(DocentError::Config(format!(
                "similarity_floor must be in [0, 1], got {}",
                self.retrieval.similarity_floor
            )));
        }
        if self.chunking.overlap_words >= self.chunking.target_words {
            return Err(DocentError::Config(format!(
                "overlap_words ({}) must be smaller than target_words ({})",
                self.chunking.overlap_words, self.chunking.target_words
            )));
        }
        if self.chunking.target_words == 0 {
            return Err(DocentError::Config("target_words must be positive".into()));
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_n == 0 {
            return Err(DocentError::Config(
                "top_k and top_n must be positive".into(),
            ));
        }
        if self.retrieval.top_n > self.retrieval.top_k {
            return Err(DocentError::Config(format!(
                "top_n ({}) cannot exceed top_k ({})",
                self.retrieval.top_n, self.retrieval.top_k
            )));
        }
        if self.answer.generation_soft_timeout_secs > self.answer.generation_hard_timeout_secs {
            return Err(DocentError::Config(
                "generation soft timeout cannot exceed the hard timeout".into(),
            ));
        }
        if self.ingest_workers == 0 {
            return Err(DocentError::Config("ingest_workers must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_blend_weight_out_of_range() {
        let mut config = Config::default();
        config.retrieval.blend_weight = 1.5;
        assert!(matches!(
            config.validate(),
            Err(DocentError::Config(_))
        ));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_target() {
        let mut config = Config::default();
        config.chunking.overlap_words = 400;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_top_n_cannot_exceed_top_k() {
        let mut config = Config::default();
        config.retrieval.top_n = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            parsed.retrieval.top_k,
            config.retrieval.top_k
        );
        assert_eq!(parsed.chunking.target_words, config.chunking.target_words);
    }
}
