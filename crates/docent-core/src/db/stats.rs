//! Corpus statistics

use super::Database;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of corpus state for the status surface
#[derive(Debug, Default, Serialize)]
pub struct CorpusStats {
    pub documents_by_status: BTreeMap<String, usize>,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub cached_embeddings: usize,
    pub unstructured_documents: usize,
}

impl Database {
    /// Collect corpus statistics
    pub fn corpus_stats(&self) -> Result<CorpusStats> {
        let mut stats = CorpusStats::default();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM documents GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            stats.total_documents += count as usize;
            stats.documents_by_status.insert(status, count as usize);
        }

        stats.total_chunks = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get::<_, i64>(0))?
            as usize;
        stats.cached_embeddings = self.conn.query_row(
            "SELECT COUNT(*) FROM embedding_cache",
            [],
            |row| row.get::<_, i64>(0),
        )? as usize;
        stats.unstructured_documents = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE unstructured = 1",
            [],
            |row| row.get::<_, i64>(0),
        )? as usize;

        Ok(stats)
    }
}
