//! Cross-encoder reranking through an external LLM service
//!
//! All candidates are scored in a single chat call: the prompt lists
//! every document and the model answers with one JSON score array.

use super::traits::{LlmClient, Reranker, ScoredDocument};
use super::ChatMessage;
use crate::config::LlmServiceConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Upper bound on excerpt length sent per document
const MAX_DOC_CHARS: usize = 600;

/// Reranker backed by an external chat model
pub struct HttpReranker {
    client: Arc<dyn LlmClient>,
}

impl HttpReranker {
    /// Create from an existing client
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Create from configuration
    pub fn from_config(config: LlmServiceConfig) -> Result<Self> {
        let client = super::HttpLlmClient::new(config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score(&self, query: &str, documents: &[ScoredDocument]) -> Result<Vec<f64>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let prompt = build_scoring_prompt(query, documents);
        let messages = vec![
            ChatMessage::system(
                "Score each document's relevance to the question from 0.0 to 1.0. \
                 Output ONLY JSON: {\"scores\": [0.0, ...]} with one score per document, in order.",
            ),
            ChatMessage::user(prompt),
        ];

        let response = self.client.chat_completion(messages).await?;
        Ok(parse_scores(&response, documents.len()))
    }

    fn model_name(&self) -> &str {
        self.client.model_name()
    }
}

fn build_scoring_prompt(query: &str, documents: &[ScoredDocument]) -> String {
    let mut prompt = format!("Question: \"{query}\"\nDocuments:\n");
    for (idx, doc) in documents.iter().enumerate() {
        let excerpt = truncate_chars(&doc.text, MAX_DOC_CHARS);
        prompt.push_str(&format!("[{idx}] {excerpt}\n"));
    }
    prompt.push_str("\nScores JSON:\n");
    prompt
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Extract a score array from model output. Malformed output degrades
/// to neutral 0.5 scores rather than failing the query.
fn parse_scores(response: &str, expected: usize) -> Vec<f64> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            tracing::warn!("reranker returned no JSON, using neutral scores");
            return vec![0.5; expected];
        }
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("failed to parse reranker JSON: {e}, using neutral scores");
            tracing::debug!("raw reranker response: {response}");
            return vec![0.5; expected];
        }
    };

    match parsed["scores"].as_array() {
        Some(arr) => (0..expected)
            .map(|i| {
                arr.get(i)
                    .and_then(|v| v.as_f64())
                    .map(|s| s.clamp(0.0, 1.0))
                    .unwrap_or(0.5)
            })
            .collect(),
        None => vec![0.5; expected],
    }
}
