//! Query orchestration
//!
//! Drives a question through retrieval, reranking, generation, and
//! gating, and always hands back a well-formed `Answer`. Stage failures
//! become the error status; thin or ungrounded evidence becomes
//! `low_confidence`; an empty candidate set becomes `no_results`.

use super::{
    build_prompt, resolve_citations, Answer, AnswerDiagnostics, AnswerStatus, AuditRecord,
    AuditSink, ConfidenceScorer,
};
use crate::config::AnswerConfig;
use crate::db::DocType;
use crate::llm::{ChatMessage, Reranker, ScoredDocument, TieredGenerator};
use crate::search::{apply_rerank_scores, Retriever};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct QueryOrchestrator {
    retriever: Retriever,
    reranker: Arc<dyn Reranker>,
    generator: TieredGenerator,
    scorer: Arc<dyn ConfidenceScorer>,
    audit: Arc<dyn AuditSink>,
    config: AnswerConfig,
    top_n: usize,
}

impl QueryOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retriever: Retriever,
        reranker: Arc<dyn Reranker>,
        generator: TieredGenerator,
        scorer: Arc<dyn ConfidenceScorer>,
        audit: Arc<dyn AuditSink>,
        config: AnswerConfig,
        top_n: usize,
    ) -> Self {
        Self {
            retriever,
            reranker,
            generator,
            scorer,
            audit,
            config,
            top_n,
        }
    }

    /// Answer a question against the corpus. Never returns an error:
    /// every failure mode maps to an answer status.
    pub async fn answer(&self, query: &str, doc_type_filter: Option<DocType>) -> Answer {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.query_deadline_secs);

        let mut answer = match tokio::time::timeout(deadline, self.run(query, doc_type_filter))
            .await
        {
            Ok(answer) => answer,
            Err(_) => Answer::error(
                format!("query deadline of {}s exceeded", self.config.query_deadline_secs),
                AnswerDiagnostics::default(),
            ),
        };
        answer.diagnostics.latency_ms = started.elapsed().as_millis() as u64;

        self.audit.record(&AuditRecord {
            query_text: query.to_string(),
            status: answer.status,
            confidence: answer.confidence,
            latency_ms: answer.diagnostics.latency_ms,
        });

        answer
    }

    async fn run(&self, query: &str, doc_type_filter: Option<DocType>) -> Answer {
        let mut diagnostics = AnswerDiagnostics::default();

        let candidates = match self.retriever.retrieve(query, doc_type_filter).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "retrieval failed");
                return Answer::error(format!("retrieval failed: {e}"), diagnostics);
            }
        };
        diagnostics.retrieved = candidates.len();

        if candidates.is_empty() {
            return Answer::no_results(diagnostics);
        }

        let docs: Vec<ScoredDocument> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| ScoredDocument {
                id: i.to_string(),
                text: c.text.clone(),
            })
            .collect();
        let scores = match self.reranker.score(query, &docs).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(error = %e, "reranking failed");
                return Answer::error(format!("reranking failed: {e}"), diagnostics);
            }
        };

        let reranked = apply_rerank_scores(candidates, &scores, self.top_n);
        diagnostics.reranked = reranked.len();

        let prompt = build_prompt(query, &reranked, self.config.context_budget_words);
        let messages = vec![
            ChatMessage::system(&prompt.system),
            ChatMessage::user(&prompt.user),
        ];

        let output = match self.generator.generate(messages).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "generation failed");
                return Answer::error(format!("generation failed: {e}"), diagnostics);
            }
        };
        diagnostics.generation_tier = Some(output.tier.to_string());

        let relevance: Vec<f64> = reranked.iter().map(|r| r.relevance).collect();
        let confidence = self.scorer.score(&relevance);
        let check = resolve_citations(&output.text, &prompt.sources);

        let status = if confidence < self.config.confidence_threshold || !check.is_grounded() {
            AnswerStatus::LowConfidence
        } else {
            AnswerStatus::Ok
        };
        debug!(
            %status,
            confidence,
            grounded = check.is_grounded(),
            tier = %output.tier,
            "answer gated"
        );

        Answer {
            text: output.text,
            citations: check.citations,
            confidence,
            status,
            diagnostics,
        }
    }
}
