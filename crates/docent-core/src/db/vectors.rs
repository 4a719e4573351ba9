//! Embedding cache storage
//!
//! Vectors are stored as little-endian f32 BLOBs, content-addressed by
//! the blake3 hash of normalized chunk text. Cosine similarity is
//! computed in Rust at query time.

use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Look up a cached embedding by content hash
    pub fn get_cached_embedding(&self, content_hash: &str, model: &str) -> Result<Option<Vec<f32>>> {
        let result = self.conn.query_row(
            "SELECT embedding FROM embedding_cache WHERE content_hash = ?1 AND model = ?2",
            params![content_hash, model],
            |row| {
                let bytes: Vec<u8> = row.get(0)?;
                Ok(bytes_to_embedding(&bytes))
            },
        );
        match result {
            Ok(embedding) => Ok(Some(embedding)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store an embedding. Replacing an existing row is harmless: the
    /// vector for identical input is deterministic, so last-writer-wins.
    pub fn put_cached_embedding(
        &self,
        content_hash: &str,
        model: &str,
        embedding: &[f32],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO embedding_cache (content_hash, model, dims, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                content_hash,
                model,
                embedding.len() as i64,
                embedding_to_bytes(embedding),
                now
            ],
        )?;
        Ok(())
    }

    /// Count cached embeddings for a model
    pub fn count_cached_embeddings(&self, model: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM embedding_cache WHERE model = ?1",
            params![model],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete cache rows no chunk references any more
    pub fn cleanup_orphaned_embeddings(&self) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM embedding_cache WHERE content_hash NOT IN
             (SELECT DISTINCT content_hash FROM chunks)",
            [],
        )?;
        Ok(rows)
    }
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
