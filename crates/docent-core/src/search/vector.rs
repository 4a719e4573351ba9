//! Dense similarity search over cached chunk vectors
//!
//! The corpus is private-lab scale, so a linear cosine scan over the
//! filtered candidate set is the index; no ANN structure to keep
//! consistent with the store.

use super::{RetrievalCandidate, SearchFilters};
use crate::db::{bytes_to_embedding, cosine_similarity, Database, DocType};
use crate::error::Result;

impl Database {
    /// Dense search over complete documents. Cosine clamped to [0, 1];
    /// ordering deterministic via (score desc, doc id, chunk index).
    pub fn search_dense(
        &self,
        query_vector: &[f32],
        model: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<RetrievalCandidate>> {
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
                e.embedding
            FROM chunks c
            JOIN documents d ON d.id = c.doc_id
            JOIN embedding_cache e ON e.content_hash = c.content_hash AND e.model = ?1
            WHERE d.status = 'complete'
        "#,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(model.to_string())];

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

        let mut stmt = self.conn.prepare(&sql)?;
        let mut candidates = stmt
            .query_map(
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| {
                    let doc_type_str: String = row.get(3)?;
                    let embedding_bytes: Vec<u8> = row.get(8)?;
                    Ok((
                        RetrievalCandidate {
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
                            lexical_score: 0.0,
                            combined_score: 0.0,
                        },
                        bytes_to_embedding(&embedding_bytes),
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (candidate, embedding) in candidates.iter_mut() {
            let sim = cosine_similarity(query_vector, embedding) as f64;
            candidate.dense_score = sim.max(0.0);
        }

        let mut results: Vec<RetrievalCandidate> =
            candidates.into_iter().map(|(c, _)| c).collect();
        results.sort_by(|a, b| {
            b.dense_score
                .partial_cmp(&a.dense_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(k);

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{content_hash, DocumentIntake, DocumentStatus};

    const MODEL: &str = "test-model";

    fn seed_with_vector(db: &Database, title: &str, text: &str, vector: &[f32]) -> i64 {
        let id = db
            .insert_document(&DocumentIntake {
                title: title.into(),
                text: text.into(),
                doc_type: DocType::Paper,
                author: "doe".into(),
                year: 2022,
            })
            .unwrap();
        let hash = content_hash(text);
        db.insert_chunk(id, 0, text, 3, None, &hash).unwrap();
        db.put_cached_embedding(&hash, MODEL, vector).unwrap();
        db.set_document_status(id, DocumentStatus::Complete).unwrap();
        id
    }

    #[test]
    fn test_dense_orders_by_similarity() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let near = seed_with_vector(&db, "near", "very similar text", &[1.0, 0.0, 0.0]);
        let far = seed_with_vector(&db, "far", "unrelated text here", &[0.0, 1.0, 0.0]);

        let results = db
            .search_dense(&[1.0, 0.1, 0.0], MODEL, 10, &SearchFilters::default())
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc_id, near);
        assert_eq!(results[1].doc_id, far);
        assert!(results[0].dense_score > results[1].dense_score);
    }

    #[test]
    fn test_negative_cosine_clamped_to_zero() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        seed_with_vector(&db, "opposite", "opposed text", &[-1.0, 0.0, 0.0]);

        let results = db
            .search_dense(&[1.0, 0.0, 0.0], MODEL, 10, &SearchFilters::default())
            .unwrap();
        assert_eq!(results[0].dense_score, 0.0);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        // Identical vectors: tie broken by doc id
        let a = seed_with_vector(&db, "a", "first twin text", &[1.0, 0.0, 0.0]);
        let b = seed_with_vector(&db, "b", "second twin text", &[1.0, 0.0, 0.0]);
        assert!(a < b);

        for _ in 0..3 {
            let results = db
                .search_dense(&[1.0, 0.0, 0.0], MODEL, 10, &SearchFilters::default())
                .unwrap();
            let ids: Vec<i64> = results.iter().map(|r| r.doc_id).collect();
            assert_eq!(ids, vec![a, b]);
        }
    }
}
