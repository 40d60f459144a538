//! Generated-content archive: documents and their embeddings, written as pairs
use crate::error::{Result, TutorError};
use crate::learner_db::schema::*;
use crate::learner_db::SqlitePool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total_documents: i64,
    pub global_documents: i64,
    pub dimension: Option<usize>,
}

pub struct DocumentStore {
    pool: Arc<SqlitePool>,
}

impl DocumentStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Insert a document and its embedding in one transaction; returns the document id.
    pub fn insert(&self, doc: &NewDocument<'_>) -> Result<i64> {
        if doc.embedding.is_empty() {
            return Err(TutorError::DataIntegrity(
                "refusing to store a document with an empty embedding".to_string(),
            ));
        }

        let vector = bincode::serialize(doc.embedding)?;
        let metadata = doc.metadata.map(serde_json::to_string).transpose()?;
        let (_, now) = now_timestamp();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (learner_id, doc_type, text, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![doc.learner_id, doc.doc_type, doc.text, metadata, now],
        )?;
        let doc_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO embeddings (doc_id, vector, embedding_model, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![doc_id, vector, doc.embedding_model, now],
        )?;
        tx.commit()?;

        debug!(
            "Stored {} document #{} ({} dims) for {:?}",
            doc.doc_type,
            doc_id,
            doc.embedding.len(),
            doc.learner_id
        );
        Ok(doc_id)
    }

    /// Up to `max_docs` most recent documents visible to `learner_id`: the global
    /// pool plus that learner's own documents. `None` sees only the global pool.
    pub fn recent_embedded(&self, learner_id: Option<i64>, max_docs: usize) -> Result<Vec<EmbeddedDocument>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.text, e.vector
             FROM documents d
             JOIN embeddings e ON e.doc_id = d.id
             WHERE d.learner_id IS NULL OR d.learner_id = ?1
             ORDER BY d.created_at DESC, d.id DESC
             LIMIT ?2",
        )?;

        let mut rows = stmt.query(params![learner_id, max_docs as i64])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let doc_id: i64 = row.get(0)?;
            let bytes: Vec<u8> = row.get(2)?;
            let vector: Vec<f32> = match bincode::deserialize(&bytes) {
                Ok(vector) => vector,
                Err(e) => {
                    warn!("Skipping document #{} with undecodable embedding: {}", doc_id, e);
                    continue;
                }
            };
            documents.push(EmbeddedDocument {
                doc_id,
                text: row.get(1)?,
                vector,
            });
        }
        Ok(documents)
    }

    /// Newest documents of one type, across all owners
    pub fn list_by_type(&self, doc_type: &str, limit: usize) -> Result<Vec<Document>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, learner_id, doc_type, text, metadata, created_at
             FROM documents
             WHERE doc_type = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let documents = stmt
            .query_map(params![doc_type, limit as i64], Self::row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(documents)
    }

    /// Fails with `DataIntegrity` if any document lacks its embedding.
    pub fn verify_integrity(&self) -> Result<()> {
        let conn = self.get_conn()?;
        let orphans: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents d
             LEFT JOIN embeddings e ON e.doc_id = d.id
             WHERE e.id IS NULL",
            [],
            |row| row.get(0),
        )?;
        if orphans > 0 {
            return Err(TutorError::DataIntegrity(format!(
                "{} document(s) have no embedding",
                orphans
            )));
        }
        Ok(())
    }

    pub fn get_stats(&self) -> Result<DocumentStats> {
        let conn = self.get_conn()?;
        let (total_documents, global_documents): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN learner_id IS NULL THEN 1 ELSE 0 END), 0)
             FROM documents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let sample: Option<Vec<u8>> = conn
            .query_row("SELECT vector FROM embeddings ORDER BY id DESC LIMIT 1", [], |row| row.get(0))
            .optional()?;
        let dimension = match sample {
            Some(bytes) => Some(bincode::deserialize::<Vec<f32>>(&bytes)?.len()),
            None => None,
        };

        Ok(DocumentStats {
            total_documents,
            global_documents,
            dimension,
        })
    }

    fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
        let metadata: Option<String> = row.get(4)?;
        let metadata = metadata
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })?;
        let created_at: String = row.get(5)?;

        Ok(Document {
            id: row.get(0)?,
            learner_id: row.get(1)?,
            doc_type: row.get(2)?,
            text: row.get(3)?,
            metadata,
            created_at: parse_timestamp(&created_at, 5)?,
        })
    }
}
