//! Embedding service with content-addressed caching
//!
//! Vectors are keyed by the blake3 hash of normalized text, so
//! identical content across documents, versions, and queries is
//! embedded at most once. A process-local map sits in front of the
//! SQLite cache to absorb concurrent duplicate requests; writes for the
//! same hash are idempotent since the provider is deterministic for
//! identical input.

use crate::db::{content_hash, normalize_text, Database};
use crate::error::{DocentError, Result};
use crate::llm::Embedder;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Bounded retry policy for transient provider failures
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Cache and provider counters
#[derive(Debug, Default, Serialize)]
pub struct EmbedStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub provider_calls: u64,
}

/// Shared embedding service, safe for concurrent use across queries
/// and ingestion workers.
pub struct EmbeddingService {
    embedder: Arc<dyn Embedder>,
    db: Arc<Mutex<Database>>,
    memory: RwLock<HashMap<String, Vec<f32>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    provider_calls: AtomicU64,
}

impl EmbeddingService {
    pub fn new(embedder: Arc<dyn Embedder>, db: Arc<Mutex<Database>>) -> Self {
        Self {
            embedder,
            db,
            memory: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            provider_calls: AtomicU64::new(0),
        }
    }

    /// Embed one text. Repeated calls with identical content return the
    /// cached vector without touching the provider.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_all(std::slice::from_ref(&text.to_string())).await?;
        Ok(vectors.remove(0))
    }

    /// Embed a batch, consulting the cache per entry and issuing a
    /// single provider call for the remainder.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached: Vec<(usize, String, String)> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let normalized = normalize_text(text);
            let hash = content_hash(text);

            if let Some(vector) = self.lookup(&hash).await? {
                self.hits.fetch_add(1, Ordering::Relaxed);
                results[i] = Some(vector);
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                uncached.push((i, hash, normalized));
            }
        }

        if !uncached.is_empty() {
            debug!(
                cached = texts.len() - uncached.len(),
                to_compute = uncached.len(),
                "embedding batch"
            );
            let inputs: Vec<String> = uncached.iter().map(|(_, _, n)| n.clone()).collect();
            let vectors = self.call_provider(&inputs).await?;

            for ((i, hash, _), vector) in uncached.into_iter().zip(vectors) {
                self.store(&hash, &vector).await?;
                results[i] = Some(vector);
            }
        }

        // Every slot was filled from cache or provider above
        Ok(results.into_iter().map(|r| r.expect("slot filled")).collect())
    }

    /// Embedding dimensions of the underlying model
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Underlying model name; keys the persistent cache
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Counter snapshot
    pub fn stats(&self) -> EmbedStats {
        EmbedStats {
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
        }
    }

    async fn lookup(&self, hash: &str) -> Result<Option<Vec<f32>>> {
        {
            let memory = self.memory.read().expect("embed cache lock poisoned");
            if let Some(vector) = memory.get(hash) {
                return Ok(Some(vector.clone()));
            }
        }

        let db = self.db.lock().await;
        let cached = db.get_cached_embedding(hash, self.embedder.model_name())?;
        drop(db);

        if let Some(ref vector) = cached {
            let mut memory = self.memory.write().expect("embed cache lock poisoned");
            memory.insert(hash.to_string(), vector.clone());
        }
        Ok(cached)
    }

    async fn store(&self, hash: &str, vector: &[f32]) -> Result<()> {
        {
            let mut memory = self.memory.write().expect("embed cache lock poisoned");
            memory.insert(hash.to_string(), vector.to_vec());
        }
        let db = self.db.lock().await;
        db.put_cached_embedding(hash, self.embedder.model_name(), vector)?;
        Ok(())
    }

    /// Call the provider with bounded exponential backoff. Exhausting
    /// retries surfaces a typed error; a zero vector is never fabricated.
    async fn call_provider(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_reason = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            self.provider_calls.fetch_add(1, Ordering::Relaxed);
            match self.embedder.embed_batch(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    warn!(attempt, error = %e, "embedding call failed, backing off {backoff:?}");
                    last_reason = e.to_string();
                    tokio::time::sleep(backoff).await;
                }
                Err(e) if e.is_transient() => {
                    last_reason = e.to_string();
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Err(DocentError::EmbeddingUnavailable {
            attempts: MAX_ATTEMPTS,
            reason: last_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Deterministic embedder counting provider calls
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_first: usize,
        transient: bool,
    }

    impl CountingEmbedder {
        fn reliable() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
                transient: true,
            }
        }

        fn flaky(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                transient: true,
            }
        }

        fn broken() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: usize::MAX,
                transient: true,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut all = self.embed_batch(&[text.to_string()]).await?;
            Ok(all.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return if self.transient {
                    Err(DocentError::RateLimited {
                        service: "test".into(),
                    })
                } else {
                    Err(DocentError::Config("permanent".into()))
                };
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0, 2.0])
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "counting-test-model"
        }
    }

    fn service(embedder: CountingEmbedder) -> (EmbeddingService, Arc<Mutex<Database>>) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let db = Arc::new(Mutex::new(db));
        (
            EmbeddingService::new(Arc::new(embedder), db.clone()),
            db,
        )
    }

    #[tokio::test]
    async fn test_repeated_embed_hits_cache() {
        let (service, _db) = service(CountingEmbedder::reliable());

        let first = service.embed("buffer composition notes").await.unwrap();
        let second = service.embed("buffer composition notes").await.unwrap();

        assert_eq!(first, second);
        let stats = service.stats();
        assert_eq!(stats.provider_calls, 1);
        assert_eq!(stats.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_whitespace_variants_share_one_vector() {
        let (service, _db) = service(CountingEmbedder::reliable());

        let a = service.embed("gel  electrophoresis\nsteps").await.unwrap();
        let b = service.embed("gel electrophoresis steps").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(service.stats().provider_calls, 1);
    }

    #[tokio::test]
    async fn test_persistent_cache_survives_memory_layer() {
        let (first_service, db) = service(CountingEmbedder::reliable());
        let vector = first_service.embed("shared text").await.unwrap();

        // Fresh service over the same database: no provider call needed
        let second_service =
            EmbeddingService::new(Arc::new(CountingEmbedder::reliable()), db);
        let cached = second_service.embed("shared text").await.unwrap();

        assert_eq!(vector, cached);
        assert_eq!(second_service.stats().provider_calls, 0);
    }

    #[tokio::test]
    async fn test_batch_mixes_cached_and_fresh() {
        let (service, _db) = service(CountingEmbedder::reliable());
        service.embed("already cached").await.unwrap();

        let vectors = service
            .embed_all(&["already cached".to_string(), "brand new".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        // One initial call plus one for the uncached entry
        assert_eq!(service.stats().provider_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retries_then_succeeds() {
        let (service, _db) = service(CountingEmbedder::flaky(2));
        let vector = service.embed("retry me").await.unwrap();
        assert_eq!(vector.len(), 3);
        assert_eq!(service.stats().provider_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_typed_error() {
        let (service, _db) = service(CountingEmbedder::broken());
        let err = service.embed("never works").await.unwrap_err();
        assert!(matches!(
            err,
            DocentError::EmbeddingUnavailable { attempts: 3, .. }
        ));
    }
}
