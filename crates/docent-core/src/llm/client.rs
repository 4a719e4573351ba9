//! HTTP client for OpenAI-compatible inference services

use super::traits::{Embedder, LlmClient};
use crate::config::LlmServiceConfig;
use crate::error::{DocentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Client for one OpenAI-compatible service (chat + embeddings)
pub struct HttpLlmClient {
    http_client: reqwest::Client,
    config: LlmServiceConfig,
}

impl HttpLlmClient {
    /// Create new client from configuration
    pub fn new(config: LlmServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(DocentError::Http)?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            req.header("Authorization", format!("Bearer {api_key}"))
        } else {
            req
        }
    }

    /// Map transport and HTTP failures to distinguishable error kinds
    /// so callers can tell rate limiting and timeouts apart.
    fn classify(&self, err: reqwest::Error) -> DocentError {
        if err.is_timeout() {
            DocentError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else {
            DocentError::Http(err)
        }
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DocentError::RateLimited {
                service: self.config.url.clone(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocentError::ExternalError(format!(
                "model service error (HTTP {status}): {body}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: 0.1,
            max_tokens: 1024,
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let response = self
            .auth(self.http_client.post(&url).json(&request))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = self.check_status(response).await?;

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| self.classify(e))?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DocentError::ExternalError("no choices in completion".to_string()))?
            .message
            .content;

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Embedder for HttpLlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| DocentError::ExternalError("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest {
            model: String,
            input: Vec<String>,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let url = format!("{}/v1/embeddings", self.config.embeddings_url());
        let response = self
            .auth(self.http_client.post(&url).json(&request))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = self.check_status(response).await?;

        let embed_response: EmbedResponse =
            response.json().await.map_err(|e| self.classify(e))?;

        if embed_response.data.len() != texts.len() {
            return Err(DocentError::ExternalError(format!(
                "embedding count mismatch: sent {}, got {}",
                texts.len(),
                embed_response.data.len()
            )));
        }

        Ok(embed_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_model
    }
}
