//! Answer assembly and gating
//!
//! Everything between retrieval and the caller: prompt construction,
//! generation, confidence scoring, citation validation, and the final
//! Answer contract.

mod citations;
mod confidence;
mod orchestrator;
mod prompt;

pub use citations::{resolve_citations, CitationCheck};
pub use confidence::{ConfidenceScorer, WeightedTopScorer};
pub use orchestrator::QueryOrchestrator;
pub use prompt::{build_prompt, BuiltPrompt, PromptSource};

use serde::Serialize;

/// Terminal status of an answer. Semantic outcomes (`no_results`,
/// `low_confidence`) are first-class statuses, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Ok,
    LowConfidence,
    NoResults,
    Error,
}

impl std::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::LowConfidence => "low_confidence",
            Self::NoResults => "no_results",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A resolved source reference in an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub document_id: i64,
    pub chunk_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

/// Per-query diagnostics returned alongside the answer
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerDiagnostics {
    pub retrieved: usize,
    pub reranked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_tier: Option<String>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The caller-facing result of `answer()`. Always structurally valid:
/// pipeline failures surface as `status = error` with empty text, never
/// as a propagated fault or fabricated content.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub status: AnswerStatus,
    pub diagnostics: AnswerDiagnostics,
}

impl Answer {
    pub(crate) fn no_results(diagnostics: AnswerDiagnostics) -> Self {
        Self {
            text: String::new(),
            citations: Vec::new(),
            confidence: 0.0,
            status: AnswerStatus::NoResults,
            diagnostics,
        }
    }

    pub(crate) fn error(reason: String, mut diagnostics: AnswerDiagnostics) -> Self {
        diagnostics.error = Some(reason);
        Self {
            text: String::new(),
            citations: Vec::new(),
            confidence: 0.0,
            status: AnswerStatus::Error,
            diagnostics,
        }
    }
}

/// Fire-and-forget audit record emitted after each answer
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub query_text: String,
    pub status: AnswerStatus,
    pub confidence: f64,
    pub latency_ms: u64,
}

/// Audit collaborator seam. Emission is not a correctness dependency:
/// implementations must not fail the query path.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Default sink: structured log line under the `audit` target
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        tracing::info!(
            target: "audit",
            query = %record.query_text,
            status = %record.status,
            confidence = record.confidence,
            latency_ms = record.latency_ms,
            "answer produced"
        );
    }
}
