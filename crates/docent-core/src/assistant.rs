//! Assembled assistant with an explicit lifecycle
//!
//! `Assistant::init` builds every collaborator from configuration and
//! wires them together; `shutdown` drains the ingestion queue. Nothing
//! here is global: embedders, rerankers, and generators are injected
//! `Arc`s, so tests swap them freely.

use crate::answer::{
    Answer, AuditSink, ConfidenceScorer, QueryOrchestrator, TracingAuditSink, WeightedTopScorer,
};
use crate::config::Config;
use crate::db::{CorpusStats, Database, DocType, Document, DocumentIntake};
use crate::embed::EmbeddingService;
use crate::error::Result;
use crate::ingest::{IngestHandle, IngestQueue, IngestionPipeline};
use crate::llm::{
    Embedder, HttpLlmClient, HttpReranker, LlmClient, Reranker, TieredGenerator,
};
use crate::search::Retriever;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// External collaborators the assistant is built from. `from_config`
/// gives the production HTTP set; tests construct this directly with
/// in-process fakes.
pub struct Backends {
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
    pub primary_llm: Arc<dyn LlmClient>,
    pub fallback_llm: Arc<dyn LlmClient>,
    pub scorer: Arc<dyn ConfidenceScorer>,
    pub audit: Arc<dyn AuditSink>,
}

impl Backends {
    /// HTTP backends against the configured OpenAI-compatible services
    pub fn from_config(config: &Config) -> Result<Self> {
        let primary = Arc::new(HttpLlmClient::new(config.llm.clone())?);
        let fallback = Arc::new(HttpLlmClient::new(config.fallback_llm.clone())?);
        Ok(Self {
            embedder: primary.clone(),
            reranker: Arc::new(HttpReranker::new(primary.clone())),
            primary_llm: primary,
            fallback_llm: fallback,
            scorer: Arc::new(WeightedTopScorer::default()),
            audit: Arc::new(TracingAuditSink),
        })
    }
}

/// The fully wired assistant
pub struct Assistant {
    db: Arc<Mutex<Database>>,
    orchestrator: QueryOrchestrator,
    queue: IngestQueue,
}

impl Assistant {
    /// Initialize against a database path. Opens (creating if needed)
    /// and migrates the store, then starts the ingestion workers.
    pub fn init(config: Config, db_path: &Path, backends: Backends) -> Result<Self> {
        config.validate()?;

        let db = Database::open(db_path)?;
        db.initialize()?;
        let db = Arc::new(Mutex::new(db));

        let embedding = Arc::new(EmbeddingService::new(backends.embedder, db.clone()));

        let retriever = Retriever::new(db.clone(), embedding.clone(), config.retrieval.clone());
        let generator = TieredGenerator::new(
            backends.primary_llm,
            backends.fallback_llm,
            Duration::from_secs(config.answer.generation_soft_timeout_secs),
            Duration::from_secs(config.answer.generation_hard_timeout_secs),
        );
        let orchestrator = QueryOrchestrator::new(
            retriever,
            backends.reranker,
            generator,
            backends.scorer,
            backends.audit,
            config.answer.clone(),
            config.retrieval.top_n,
        );

        let pipeline = Arc::new(IngestionPipeline::new(
            db.clone(),
            embedding,
            config.chunking.clone(),
        ));
        let queue = IngestQueue::start(pipeline, config.ingest_workers);

        info!(db = %db_path.display(), "assistant initialized");
        Ok(Self {
            db,
            orchestrator,
            queue,
        })
    }

    /// Answer a question against the corpus
    pub async fn ask(&self, query: &str, doc_type_filter: Option<DocType>) -> Answer {
        self.orchestrator.answer(query, doc_type_filter).await
    }

    /// Queue a document for ingestion; await the handle for the outcome
    pub async fn ingest(&self, intake: DocumentIntake) -> Result<IngestHandle> {
        self.queue.submit(intake).await
    }

    /// All documents with their ingestion state, newest first
    pub async fn documents(&self) -> Result<Vec<Document>> {
        let db = self.db.lock().await;
        db.list_documents()
    }

    /// Corpus-wide counters
    pub async fn stats(&self) -> Result<CorpusStats> {
        let db = self.db.lock().await;
        db.corpus_stats()
    }

    /// Remove a document, its chunks, and any now-orphaned embeddings
    pub async fn remove(&self, doc_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        db.purge_document(doc_id)
    }

    /// Drain in-flight ingestions and stop the workers
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
        info!("assistant shut down");
    }
}
