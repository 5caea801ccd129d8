//! Chunk repository: reads extracted chunks and stores their classification.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::classifier::ChunkClassificationResult;

/// A stored document chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub content: String,
    pub chunk_type: Option<String>,
    pub chunk_type_confidence: Option<f64>,
    pub chunk_type_metadata: Option<serde_json::Value>,
}

impl ChunkRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let metadata: Option<String> = row.get("chunk_type_metadata")?;
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            chunk_index: row.get("chunk_index")?,
            content: row.get("content")?,
            chunk_type: row.get("chunk_type")?,
            chunk_type_confidence: row.get("chunk_type_confidence")?,
            chunk_type_metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        })
    }
}

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// All chunks of a document, in chunk order.
    async fn list_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>, DatabaseError>;

    /// Overwrites the classification fields of a chunk. Returns `false` if
    /// the chunk does not exist.
    async fn update_classification(
        &self,
        chunk_id: &str,
        result: &ChunkClassificationResult,
    ) -> Result<bool, DatabaseError>;
}

/// SQLite-backed [`ChunkRepository`].
#[derive(Clone)]
pub struct SqliteChunkRepository {
    db: Database,
}

impl SqliteChunkRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChunkRepository for SqliteChunkRepository {
    async fn list_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>, DatabaseError> {
        let document_id = document_id.to_owned();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT * FROM document_chunks WHERE document_id = ?1 ORDER BY chunk_index",
                )?;
                let rows = stmt
                    .query_map(params![document_id], ChunkRecord::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    async fn update_classification(
        &self,
        chunk_id: &str,
        result: &ChunkClassificationResult,
    ) -> Result<bool, DatabaseError> {
        let metadata = serde_json::to_string(&result.metadata)?;
        let chunk_id = chunk_id.to_owned();
        let (chunk_type, confidence) = (result.chunk_type, result.confidence);
        self.db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE document_chunks
                     SET chunk_type = ?2, chunk_type_confidence = ?3, chunk_type_metadata = ?4,
                         updated_at = ?5
                     WHERE id = ?1",
                    params![
                        chunk_id,
                        chunk_type.as_str(),
                        confidence,
                        metadata,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(changed == 1)
            })
            .await
    }
}

/// Inserts an unclassified chunk row.
pub fn insert_chunk(
    db: &Database,
    id: &str,
    document_id: &str,
    chunk_index: u32,
    content: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO document_chunks (id, document_id, chunk_index, content)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, document_id, chunk_index, content],
        )?;
        Ok(())
    })
}
