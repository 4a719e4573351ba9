//! Storage layer for docent
//!
//! SQLite-backed with:
//! - FTS5 full-text index over chunks (lexical half of hybrid search)
//! - embedding BLOB storage, content-addressed by chunk hash
//! - document/chunk metadata with ingestion state tracking

mod chunks;
mod documents;
mod schema;
mod stats;
pub mod vectors;

pub use chunks::ChunkRecord;
pub use documents::{DocType, Document, DocumentIntake, DocumentStatus};
pub use schema::Database;
pub use stats::CorpusStats;
pub use vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};

use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("corpus.sqlite")
    }
}

/// Hash normalized chunk text for the content-addressed embedding cache.
///
/// Identical text across documents or re-ingested versions hashes to the
/// same key, so its vector is computed once and shared.
pub fn content_hash(text: &str) -> String {
    blake3::hash(normalize_text(text).as_bytes())
        .to_hex()
        .to_string()
}

/// Collapse runs of whitespace so formatting differences do not defeat
/// cache sharing. Case is preserved: embedding models are case-sensitive.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
