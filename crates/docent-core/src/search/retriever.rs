//! First-pass retrieval for the answer pipeline

use super::{hybrid_search, RetrievalCandidate, SearchFilters};
use crate::config::RetrievalConfig;
use crate::db::{Database, DocType};
use crate::embed::EmbeddingService;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Embeds the query and runs hybrid search against the corpus.
///
/// An empty candidate set is a valid outcome, not an error: it drives
/// the `no_results` answer status.
pub struct Retriever {
    db: Arc<Mutex<Database>>,
    embedding: Arc<EmbeddingService>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        db: Arc<Mutex<Database>>,
        embedding: Arc<EmbeddingService>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            db,
            embedding,
            config,
        }
    }

    /// Retrieve up to `top_k` candidates clearing the similarity floor
    pub async fn retrieve(
        &self,
        query_text: &str,
        doc_type_filter: Option<DocType>,
    ) -> Result<Vec<RetrievalCandidate>> {
        let query_vector = self.embedding.embed(query_text).await?;
        let filters = SearchFilters::for_doc_type(doc_type_filter);

        let db = self.db.lock().await;
        let candidates = hybrid_search(
            &db,
            &query_vector,
            query_text,
            self.embedding.model_name(),
            self.config.top_k,
            self.config.blend_weight,
            &filters,
        )?;
        drop(db);

        let floor = self.config.similarity_floor;
        let cleared: Vec<RetrievalCandidate> = candidates
            .into_iter()
            .filter(|c| c.combined_score >= floor)
            .collect();

        debug!(
            query = query_text,
            candidates = cleared.len(),
            floor,
            "retrieval complete"
        );
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{content_hash, DocumentIntake, DocumentStatus};
    use crate::error::Result;
    use crate::llm::Embedder;
    use async_trait::async_trait;

    /// Embeds to a fixed axis so similarity is controlled by the test
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut all = self.embed_batch(&[text.to_string()]).await?;
            Ok(all.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("annealing") {
                        vec![1.0, 0.0, 0.0]
                    } else {
                        vec![0.0, 1.0, 0.0]
                    }
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "axis-test-model"
        }
    }

    async fn setup(texts: &[(&str, &str, DocType)]) -> Retriever {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        for (title, text, doc_type) in texts {
            let id = db
                .insert_document(&DocumentIntake {
                    title: title.to_string(),
                    text: text.to_string(),
                    doc_type: *doc_type,
                    author: "kim".into(),
                    year: 2020,
                })
                .unwrap();
            let hash = content_hash(text);
            db.insert_chunk(id, 0, text, text.split_whitespace().count(), None, &hash)
                .unwrap();
            let vector = if text.contains("annealing") {
                vec![1.0, 0.0, 0.0]
            } else {
                vec![0.0, 1.0, 0.0]
            };
            db.put_cached_embedding(&hash, "axis-test-model", &vector)
                .unwrap();
            db.index_document_fts(id).unwrap();
            db.set_document_status(id, DocumentStatus::Complete).unwrap();
        }

        let db = Arc::new(Mutex::new(db));
        let embedding = Arc::new(EmbeddingService::new(Arc::new(AxisEmbedder), db.clone()));
        Retriever::new(db, embedding, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_retrieve_finds_matching_chunk() {
        let retriever = setup(&[
            ("PCR", "annealing temperature is 55C", DocType::Protocol),
            ("Gels", "agarose gel preparation", DocType::Protocol),
        ])
        .await;

        let results = retriever.retrieve("annealing temperature", None).await.unwrap();
        assert!(!results.is_empty());
        assert!(results[0].text.contains("annealing"));
    }

    #[tokio::test]
    async fn test_no_match_returns_empty_not_error() {
        let retriever = setup(&[("Gels", "agarose gel preparation", DocType::Protocol)]).await;

        let results = retriever
            .retrieve("annealing temperature quantum chromodynamics", None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_doc_type_filter_applies() {
        let retriever = setup(&[
            ("P", "annealing temperature protocol", DocType::Protocol),
            ("T", "annealing temperature thesis chapter", DocType::Thesis),
        ])
        .await;

        let results = retriever
            .retrieve("annealing temperature", Some(DocType::Thesis))
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|c| c.doc_type == DocType::Thesis));
    }
}
