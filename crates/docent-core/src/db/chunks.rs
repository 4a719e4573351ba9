//! Chunk storage and FTS indexing

use super::Database;
use crate::error::{DocentError, Result};
use rusqlite::params;

/// Stored chunk row with document metadata joined in
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub doc_id: i64,
    pub chunk_index: i64,
    pub text: String,
    pub word_count: i64,
    pub chapter: Option<String>,
    pub content_hash: String,
}

impl Database {
    /// Insert one chunk. FTS indexing happens separately at the index
    /// step so half-ingested documents stay invisible to search.
    pub fn insert_chunk(
        &self,
        doc_id: i64,
        chunk_index: usize,
        text: &str,
        word_count: usize,
        chapter: Option<&str>,
        content_hash: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO chunks (doc_id, chunk_index, text, word_count, chapter, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                doc_id,
                chunk_index as i64,
                text,
                word_count as i64,
                chapter,
                content_hash
            ],
        )?;
        Ok(())
    }

    /// Populate the FTS index for every chunk of a document
    pub fn index_document_fts(&self, doc_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "INSERT INTO chunks_fts (rowid, text)
             SELECT id, text FROM chunks
             WHERE doc_id = ?1
               AND id NOT IN (SELECT rowid FROM chunks_fts)",
            params![doc_id],
        )?;
        Ok(rows)
    }

    /// All chunks of a document in order
    pub fn chunks_for_document(&self, doc_id: i64) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT doc_id, chunk_index, text, word_count, chapter, content_hash
             FROM chunks WHERE doc_id = ?1 ORDER BY chunk_index",
        )?;
        let chunks = stmt
            .query_map(params![doc_id], Self::row_to_chunk)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    /// Fetch one chunk by (doc_id, chunk_index)
    pub fn get_chunk(&self, doc_id: i64, chunk_index: i64) -> Result<ChunkRecord> {
        let result = self.conn.query_row(
            "SELECT doc_id, chunk_index, text, word_count, chapter, content_hash
             FROM chunks WHERE doc_id = ?1 AND chunk_index = ?2",
            params![doc_id, chunk_index],
            Self::row_to_chunk,
        );
        match result {
            Ok(chunk) => Ok(chunk),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(DocentError::DocumentNotFound(
                format!("{doc_id}#{chunk_index}"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
        Ok(ChunkRecord {
            doc_id: row.get(0)?,
            chunk_index: row.get(1)?,
            text: row.get(2)?,
            word_count: row.get(3)?,
            chapter: row.get(4)?,
            content_hash: row.get(5)?,
        })
    }
}
