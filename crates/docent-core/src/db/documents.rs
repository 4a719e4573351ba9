//! Document metadata and ingestion state tracking

use super::Database;
use crate::error::{DocentError, Result};
use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// Document category, drives chunking policy and retrieval filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Protocol,
    Paper,
    Thesis,
    Note,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Paper => "paper",
            Self::Thesis => "thesis",
            Self::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "protocol" => Ok(Self::Protocol),
            "paper" => Ok(Self::Paper),
            "thesis" => Ok(Self::Thesis),
            "note" => Ok(Self::Note),
            other => Err(DocentError::InvalidInput(format!(
                "unknown doc_type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-document ingestion state machine.
///
/// `received -> parsed -> chunked -> embedded -> indexed -> complete`,
/// with `error` reachable from any step. Only `complete` documents are
/// visible to retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Received,
    Parsed,
    Chunked,
    Embedded,
    Indexed,
    Complete,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Parsed => "parsed",
            Self::Chunked => "chunked",
            Self::Embedded => "embedded",
            Self::Indexed => "indexed",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "received" => Ok(Self::Received),
            "parsed" => Ok(Self::Parsed),
            "chunked" => Ok(Self::Chunked),
            "embedded" => Ok(Self::Embedded),
            "indexed" => Ok(Self::Indexed),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            other => Err(DocentError::InvalidInput(format!(
                "unknown document status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intake contract from the upload/CLI collaborator
#[derive(Debug, Clone)]
pub struct DocumentIntake {
    pub title: String,
    pub text: String,
    pub doc_type: DocType,
    pub author: String,
    pub year: i32,
}

/// Stored document row
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub doc_type: DocType,
    pub author: String,
    pub year: i32,
    pub version: i64,
    pub status: DocumentStatus,
    pub unstructured: bool,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Database {
    /// Register a newly received document. Re-ingestion of the same
    /// title/author creates a new version rather than mutating in place.
    pub fn insert_document(&self, intake: &DocumentIntake) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let next_version: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM documents
             WHERE title = ?1 AND author = ?2",
            params![intake.title, intake.author],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO documents (title, doc_type, author, year, version, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'received', ?6, ?6)",
            params![
                intake.title,
                intake.doc_type.as_str(),
                intake.author,
                intake.year,
                next_version,
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Advance the ingestion state machine
    pub fn set_document_status(&self, doc_id: i64, status: DocumentStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE documents SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, doc_id],
        )?;
        if rows == 0 {
            return Err(DocentError::DocumentNotFound(doc_id.to_string()));
        }
        Ok(())
    }

    /// Mark a document failed with a reason. Terminal until re-ingestion.
    pub fn set_document_error(&self, doc_id: i64, reason: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE documents SET status = 'error', error = ?1, updated_at = ?2 WHERE id = ?3",
            params![reason, now, doc_id],
        )?;
        Ok(())
    }

    /// Flag a thesis whose chapter detection failed; it was chunked as a
    /// whole document and is surfaced for optional human review.
    pub fn set_document_unstructured(&self, doc_id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE documents SET unstructured = 1, updated_at = ?1 WHERE id = ?2",
            params![now, doc_id],
        )?;
        Ok(())
    }

    /// Fetch a document by id
    pub fn get_document(&self, doc_id: i64) -> Result<Document> {
        let result = self.conn.query_row(
            "SELECT id, title, doc_type, author, year, version, status, unstructured, error, created_at, updated_at
             FROM documents WHERE id = ?1",
            params![doc_id],
            Self::row_to_document,
        );
        match result {
            Ok(doc) => Ok(doc),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(DocentError::DocumentNotFound(doc_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List all documents, newest first
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, doc_type, author, year, version, status, unstructured, error, created_at, updated_at
             FROM documents ORDER BY id DESC",
        )?;
        let docs = stmt
            .query_map([], Self::row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Purge a document: cascades to its chunks and FTS rows, then
    /// removes cache entries no surviving chunk still references.
    pub fn purge_document(&self, doc_id: i64) -> Result<()> {
        // Existence check first so callers get a typed not-found
        self.get_document(doc_id)?;

        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<()> {
            self.conn.execute(
                "DELETE FROM chunks_fts WHERE rowid IN (SELECT id FROM chunks WHERE doc_id = ?1)",
                params![doc_id],
            )?;
            self.conn
                .execute("DELETE FROM chunks WHERE doc_id = ?1", params![doc_id])?;
            self.conn
                .execute("DELETE FROM documents WHERE id = ?1", params![doc_id])?;
            // Embeddings are shared across documents, so only cache rows
            // nothing references any more go with them.
            self.cleanup_orphaned_embeddings()?;
            Ok(())
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let doc_type_str: String = row.get(2)?;
        let status_str: String = row.get(6)?;
        Ok(Document {
            id: row.get(0)?,
            title: row.get(1)?,
            doc_type: DocType::parse(&doc_type_str).map_err(|_| {
                rusqlite::Error::InvalidColumnType(2, "doc_type".into(), rusqlite::types::Type::Text)
            })?,
            author: row.get(3)?,
            year: row.get(4)?,
            version: row.get(5)?,
            status: DocumentStatus::parse(&status_str).map_err(|_| {
                rusqlite::Error::InvalidColumnType(6, "status".into(), rusqlite::types::Type::Text)
            })?,
            unstructured: row.get::<_, i64>(7)? != 0,
            error: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
