//! Tiered generation with timeout-driven fallback
//!
//! The primary hosted model gets a soft timeout; on timeout, error, or
//! rate limit the fallback tier (smaller or local model) is tried
//! within the remaining hard budget. Exhausting both tiers yields a
//! typed `GenerationUnavailable`, never an unbounded retry loop.

use super::traits::LlmClient;
use super::ChatMessage;
use crate::error::{DocentError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Which model tier produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTier {
    Primary,
    Fallback,
}

impl std::fmt::Display for GenerationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Generated text plus the tier that produced it
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub text: String,
    pub tier: GenerationTier,
}

/// Two-tier generation client
pub struct TieredGenerator {
    primary: Arc<dyn LlmClient>,
    fallback: Arc<dyn LlmClient>,
    soft_timeout: Duration,
    hard_timeout: Duration,
}

impl TieredGenerator {
    pub fn new(
        primary: Arc<dyn LlmClient>,
        fallback: Arc<dyn LlmClient>,
        soft_timeout: Duration,
        hard_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            soft_timeout,
            hard_timeout,
        }
    }

    /// Generate a completion, falling back on primary-tier failure
    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<GenerationOutput> {
        let primary_err = match tokio::time::timeout(
            self.soft_timeout,
            self.primary.chat_completion(messages.clone()),
        )
        .await
        {
            Ok(Ok(text)) => {
                return Ok(GenerationOutput {
                    text,
                    tier: GenerationTier::Primary,
                })
            }
            Ok(Err(e)) => e,
            Err(_) => DocentError::Timeout(self.soft_timeout),
        };

        warn!(
            model = self.primary.model_name(),
            error = %primary_err,
            "primary generation tier failed, trying fallback"
        );

        let fallback_budget = self.hard_timeout.saturating_sub(self.soft_timeout);
        match tokio::time::timeout(fallback_budget, self.fallback.chat_completion(messages)).await
        {
            Ok(Ok(text)) => Ok(GenerationOutput {
                text,
                tier: GenerationTier::Fallback,
            }),
            Ok(Err(fallback_err)) => Err(DocentError::GenerationUnavailable(format!(
                "primary: {primary_err}; fallback: {fallback_err}"
            ))),
            Err(_) => Err(DocentError::GenerationUnavailable(format!(
                "primary: {primary_err}; fallback: timed out after {fallback_budget:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClient {
        response: Result<&'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StubClient {
        fn ok(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(DocentError::ExternalError("boom".into())),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(text: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text),
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.response {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(DocentError::ExternalError("boom".into())),
            }
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn generator(
        primary: Arc<StubClient>,
        fallback: Arc<StubClient>,
    ) -> TieredGenerator {
        TieredGenerator::new(
            primary,
            fallback,
            Duration::from_millis(50),
            Duration::from_millis(150),
        )
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = StubClient::ok("answer");
        let fallback = StubClient::ok("unused");
        let gen = generator(primary.clone(), fallback.clone());

        let out = gen.generate(vec![ChatMessage::user("q")]).await.unwrap();
        assert_eq!(out.tier, GenerationTier::Primary);
        assert_eq!(out.text, "answer");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_timeout_uses_fallback() {
        let primary = StubClient::slow("late", Duration::from_millis(200));
        let fallback = StubClient::ok("from fallback");
        let gen = generator(primary, fallback.clone());

        let out = gen.generate(vec![ChatMessage::user("q")]).await.unwrap();
        assert_eq!(out.tier, GenerationTier::Fallback);
        assert_eq!(out.text, "from fallback");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_error_uses_fallback() {
        let gen = generator(StubClient::failing(), StubClient::ok("rescued"));
        let out = gen.generate(vec![ChatMessage::user("q")]).await.unwrap();
        assert_eq!(out.tier, GenerationTier::Fallback);
    }

    #[tokio::test]
    async fn test_both_tiers_failing_is_typed() {
        let gen = generator(StubClient::failing(), StubClient::failing());
        let err = gen.generate(vec![ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, DocentError::GenerationUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fallback_timeout_is_typed() {
        let gen = generator(
            StubClient::failing(),
            StubClient::slow("too late", Duration::from_millis(500)),
        );
        let err = gen.generate(vec![ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, DocentError::GenerationUnavailable(_)));
    }
}
