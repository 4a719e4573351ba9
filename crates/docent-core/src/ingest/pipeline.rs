//! The per-document ingestion state machine

use crate::config::ChunkingConfig;
use crate::db::{content_hash, Database, DocumentIntake, DocumentStatus};
use crate::embed::EmbeddingService;
use crate::error::{DocentError, Result};
use crate::index::chunk_document;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Chunks embedded per provider call during ingestion
const EMBED_BATCH_SIZE: usize = 32;

/// Drives one document from intake to searchable.
///
/// Visibility is all-or-nothing: every persistence step happens under
/// a non-complete status, and retrieval only sees complete documents,
/// so a crash mid-ingestion can never surface a half-indexed document.
pub struct IngestionPipeline {
    db: Arc<Mutex<Database>>,
    embedding: Arc<EmbeddingService>,
    chunking: ChunkingConfig,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<Mutex<Database>>,
        embedding: Arc<EmbeddingService>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            db,
            embedding,
            chunking,
        }
    }

    /// Ingest one document. On failure the document is left in the
    /// terminal error state with the reason recorded, and the error is
    /// returned to the caller.
    pub async fn ingest(&self, intake: DocumentIntake) -> Result<i64> {
        let doc_id = {
            let db = self.db.lock().await;
            db.insert_document(&intake)?
        };
        info!(doc_id, title = %intake.title, doc_type = %intake.doc_type, "document received");

        match self.run(doc_id, &intake).await {
            Ok(()) => {
                info!(doc_id, "ingestion complete");
                Ok(doc_id)
            }
            Err(e) => {
                warn!(doc_id, error = %e, "ingestion failed");
                let db = self.db.lock().await;
                // Best effort: the original failure is what the caller sees
                if let Err(mark_err) = db.set_document_error(doc_id, &e.to_string()) {
                    warn!(doc_id, error = %mark_err, "failed to record error state");
                }
                Err(e)
            }
        }
    }

    async fn run(&self, doc_id: i64, intake: &DocumentIntake) -> Result<()> {
        // Parse: the intake contract guarantees text, but an upload of
        // scanned pages can still arrive empty after extraction.
        let text = intake.text.trim();
        if text.is_empty() {
            return Err(DocentError::Parse(
                "document contains no extractable text".into(),
            ));
        }
        self.set_status(doc_id, DocumentStatus::Parsed).await?;

        // Chunk
        let outcome = chunk_document(text, intake.doc_type, &self.chunking);
        if outcome.chunks.is_empty() {
            return Err(DocentError::Parse("chunking produced no chunks".into()));
        }
        {
            let db = self.db.lock().await;
            for chunk in &outcome.chunks {
                db.insert_chunk(
                    doc_id,
                    chunk.index,
                    &chunk.text,
                    chunk.word_count,
                    chunk.chapter.as_deref(),
                    &content_hash(&chunk.text),
                )?;
            }
            if outcome.unstructured {
                db.set_document_unstructured(doc_id)?;
            }
        }
        self.set_status(doc_id, DocumentStatus::Chunked).await?;

        // Embed: populates the content-addressed cache the dense index
        // reads from. Chunks already cached cost nothing here.
        let texts: Vec<String> = outcome.chunks.iter().map(|c| c.text.clone()).collect();
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            self.embedding.embed_all(batch).await?;
        }
        self.set_status(doc_id, DocumentStatus::Embedded).await?;

        // Index
        {
            let db = self.db.lock().await;
            db.index_document_fts(doc_id)?;
        }
        self.set_status(doc_id, DocumentStatus::Indexed).await?;

        self.set_status(doc_id, DocumentStatus::Complete).await
    }

    async fn set_status(&self, doc_id: i64, status: DocumentStatus) -> Result<()> {
        let db = self.db.lock().await;
        db.set_document_status(doc_id, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DocType;
    use crate::error::Result;
    use crate::llm::Embedder;
    use crate::search::SearchFilters;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for TestEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut all = self.embed_batch(&[text.to_string()]).await?;
            Ok(all.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DocentError::Config("provider misconfigured".into()));
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "pipeline-test-model"
        }
    }

    fn pipeline(fail_embeds: bool) -> (IngestionPipeline, Arc<Mutex<Database>>) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let db = Arc::new(Mutex::new(db));
        let embedder = Arc::new(TestEmbedder {
            calls: AtomicUsize::new(0),
            fail: fail_embeds,
        });
        let embedding = Arc::new(EmbeddingService::new(embedder, db.clone()));
        (
            IngestionPipeline::new(db.clone(), embedding, ChunkingConfig::default()),
            db,
        )
    }

    fn intake(title: &str, text: &str, doc_type: DocType) -> DocumentIntake {
        DocumentIntake {
            title: title.into(),
            text: text.into(),
            doc_type,
            author: "park".into(),
            year: 2024,
        }
    }

    #[tokio::test]
    async fn test_successful_ingestion_reaches_complete() {
        let (pipeline, db) = pipeline(false);
        let doc_id = pipeline
            .ingest(intake(
                "PCR protocol",
                "Set the annealing temperature to 55 degrees. Extend for thirty seconds.",
                DocType::Protocol,
            ))
            .await
            .unwrap();

        let db = db.lock().await;
        let doc = db.get_document(doc_id).unwrap();
        assert_eq!(doc.status, DocumentStatus::Complete);
        assert!(!doc.unstructured);

        let chunks = db.chunks_for_document(doc_id).unwrap();
        assert!(!chunks.is_empty());
        // Complete documents are visible to lexical search
        let hits = db
            .search_lexical("annealing", 10, &SearchFilters::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_marks_error_and_hides_document() {
        let (pipeline, db) = pipeline(true);
        let err = pipeline
            .ingest(intake(
                "Doomed",
                "Centrifuge the sample at full speed for two minutes.",
                DocType::Note,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DocentError::Config(_)));

        let db = db.lock().await;
        let docs = db.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].status, DocumentStatus::Error);
        assert!(docs[0].error.is_some());

        // Failed documents never surface in search
        let hits = db
            .search_lexical("centrifuge", 10, &SearchFilters::default())
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_parse_error() {
        let (pipeline, db) = pipeline(false);
        let err = pipeline
            .ingest(intake("Blank", "   \n  ", DocType::Note))
            .await
            .unwrap_err();
        assert!(matches!(err, DocentError::Parse(_)));

        let db = db.lock().await;
        assert_eq!(
            db.list_documents().unwrap()[0].status,
            DocumentStatus::Error
        );
    }

    #[tokio::test]
    async fn test_thesis_without_chapters_flagged_unstructured() {
        let (pipeline, db) = pipeline(false);
        let doc_id = pipeline
            .ingest(intake(
                "Thesis draft",
                "A long body of prose with no chapter headings at all. It still gets chunked.",
                DocType::Thesis,
            ))
            .await
            .unwrap();

        let db = db.lock().await;
        let doc = db.get_document(doc_id).unwrap();
        assert_eq!(doc.status, DocumentStatus::Complete);
        assert!(doc.unstructured);
    }

    #[tokio::test]
    async fn test_thesis_chapters_carried_onto_chunks() {
        let (pipeline, db) = pipeline(false);
        let text = "Chapter 1 Introduction\nThe study begins here with motivation.\n\
                    Chapter 2 Methods\nSamples were prepared as described.";
        let doc_id = pipeline
            .ingest(intake("Thesis", text, DocType::Thesis))
            .await
            .unwrap();

        let db = db.lock().await;
        let chunks = db.chunks_for_document(doc_id).unwrap();
        assert!(chunks.iter().any(|c| {
            c.chapter
                .as_deref()
                .is_some_and(|ch| ch.contains("Introduction"))
        }));
        assert!(chunks.iter().any(|c| {
            c.chapter
                .as_deref()
                .is_some_and(|ch| ch.contains("Methods"))
        }));
    }
}
