//! # docent-core
//!
//! Retrieval-augmented question answering over a private corpus of lab
//! documents: protocols, papers, theses, and notes.
//!
//! The pipeline: documents are chunked on sentence boundaries, embedded
//! through a content-addressed cache, and indexed for hybrid
//! (dense + BM25) search. Questions are answered by reranking retrieved
//! chunks, prompting a tiered generation backend, and gating the output
//! on confidence and citation validity.
//!
//! [`Assistant`] wires the whole thing together; the individual layers
//! are public for embedding into other services.

pub mod answer;
pub mod assistant;
pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod search;

pub use answer::{Answer, AnswerStatus, Citation};
pub use assistant::{Assistant, Backends};
pub use config::Config;
pub use db::{Database, DocType, DocumentIntake, DocumentStatus};
pub use error::{DocentError, Result};

/// Directory name under the platform cache dir for the corpus database
pub const CACHE_DIR_NAME: &str = "docent";

/// Directory name under the platform config dir for config files
pub const CONFIG_DIR_NAME: &str = "docent";
