//! BM25 full-text search via FTS5

use super::{sanitize_fts_query, RetrievalCandidate, SearchFilters};
use crate::db::{Database, DocType};
use crate::error::Result;

impl Database {
    /// Lexical search over complete documents. Scores are BM25 squashed
    /// into [0, 1]. Ordering is deterministic: score, then doc id, then
    /// chunk index.
    pub fn search_lexical(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<RetrievalCandidate>> {
        let sanitized = sanitize_fts_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r#"
            SELECT
                c.doc_id,
                c.chunk_index,
                d.title,
                d.doc_type,
                d.author,
                d.year,
                c.chapter,
                c.text,
                1.0 / (1.0 + (-1.0 * bm25(chunks_fts))) as score
            FROM chunks_fts fts
            JOIN chunks c ON c.id = fts.rowid
            JOIN documents d ON d.id = c.doc_id
            WHERE chunks_fts MATCH ?1 AND d.status = 'complete'
        "#,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(sanitized)];

        if let Some(doc_type) = filters.doc_type {
            sql.push_str(" AND d.doc_type = ?");
            sql.push_str(&(params_vec.len() + 1).to_string());
            params_vec.push(Box::new(doc_type.as_str().to_string()));
        }
        if let Some(ref author) = filters.author {
            sql.push_str(" AND d.author = ?");
            sql.push_str(&(params_vec.len() + 1).to_string());
            params_vec.push(Box::new(author.clone()));
        }
        if let Some(year) = filters.year {
            sql.push_str(" AND d.year = ?");
            sql.push_str(&(params_vec.len() + 1).to_string());
            params_vec.push(Box::new(year));
        }

        sql.push_str(" ORDER BY score DESC, c.doc_id, c.chunk_index");
        if k > 0 {
            sql.push_str(&format!(" LIMIT {k}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let results = stmt
            .query_map(
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| {
                    let doc_type_str: String = row.get(3)?;
                    let score: f64 = row.get(8)?;
                    Ok(RetrievalCandidate {
                        doc_id: row.get(0)?,
                        chunk_index: row.get(1)?,
                        doc_title: row.get(2)?,
                        doc_type: DocType::parse(&doc_type_str).map_err(|_| {
                            rusqlite::Error::InvalidColumnType(
                                3,
                                "doc_type".into(),
                                rusqlite::types::Type::Text,
                            )
                        })?,
                        author: row.get(4)?,
                        year: row.get(5)?,
                        chapter: row.get(6)?,
                        text: row.get(7)?,
                        dense_score: 0.0,
                        lexical_score: score,
                        combined_score: 0.0,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentIntake, DocumentStatus};

    fn seed(db: &Database, title: &str, doc_type: DocType, text: &str, complete: bool) -> i64 {
        let id = db
            .insert_document(&DocumentIntake {
                title: title.into(),
                text: text.into(),
                doc_type,
                author: "smith".into(),
                year: 2023,
            })
            .unwrap();
        db.insert_chunk(id, 0, text, text.split_whitespace().count(), None, "h")
            .unwrap();
        db.index_document_fts(id).unwrap();
        if complete {
            db.set_document_status(id, DocumentStatus::Complete).unwrap();
        }
        id
    }

    #[test]
    fn test_lexical_matches_terms() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed(
            &db,
            "PCR",
            DocType::Protocol,
            "Set the annealing temperature to 55 degrees.",
            true,
        );
        seed(&db, "Gels", DocType::Protocol, "Prepare the agarose gel.", true);

        let results = db
            .search_lexical("annealing temperature", 10, &SearchFilters::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("annealing"));
        assert!(results[0].lexical_score > 0.0);
    }

    #[test]
    fn test_incomplete_documents_are_invisible() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed(
            &db,
            "Draft",
            DocType::Note,
            "Centrifuge speed settings for extraction.",
            false,
        );

        let results = db
            .search_lexical("centrifuge", 10, &SearchFilters::default())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_doc_type_filter() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed(&db, "P", DocType::Protocol, "Incubation at room temperature.", true);
        seed(&db, "N", DocType::Note, "Incubation went fine today.", true);

        let filters = SearchFilters::for_doc_type(Some(DocType::Protocol));
        let results = db.search_lexical("incubation", 10, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_type, DocType::Protocol);
    }

    #[test]
    fn test_stop_word_only_query_is_empty() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let results = db
            .search_lexical("what is the", 10, &SearchFilters::default())
            .unwrap();
        assert!(results.is_empty());
    }
}
