//! Batch job repository: the `batch_jobs` and `batch_documents` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::batch::model::{
    BatchJob, BatchOptions, BatchStatus, DocumentJobEntry, DocumentStatus, DocumentUpdate,
};

/// Storage for batch jobs.
///
/// Progress fields are written only by the executor (`mark_processing`,
/// `mark_documents_processing`, `record_window`, `finish`); the controller
/// only ever moves a job to `cancelled`. Every transition is guarded on the
/// stored status so a terminal job is never modified again.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &BatchJob) -> Result<(), DatabaseError>;

    async fn find(&self, batch_id: &str) -> Result<Option<BatchJob>, DatabaseError>;

    /// Finds a job only if `owner_id` owns it.
    async fn find_for_owner(
        &self,
        batch_id: &str,
        owner_id: &str,
    ) -> Result<Option<BatchJob>, DatabaseError>;

    /// `queued` -> `processing`. Returns `false` if the job was not queued.
    async fn mark_processing(&self, batch_id: &str) -> Result<bool, DatabaseError>;

    /// Flags the given pending documents as in flight.
    async fn mark_documents_processing(
        &self,
        batch_id: &str,
        positions: &[usize],
    ) -> Result<(), DatabaseError>;

    /// Applies the outcomes of one settled window and bumps the counters,
    /// atomically. Returns `false` and writes nothing once the job is terminal.
    async fn record_window(
        &self,
        batch_id: &str,
        updates: &[DocumentUpdate],
    ) -> Result<bool, DatabaseError>;

    /// Moves a running job to a terminal status and stamps `completed_at`.
    async fn finish(&self, batch_id: &str, status: BatchStatus) -> Result<bool, DatabaseError>;

    /// `queued`/`processing` -> `cancelled` for the owner. Entries still
    /// `processing` go back to `pending`. Returns `false` when no such
    /// cancellable job exists.
    async fn cancel(&self, batch_id: &str, owner_id: &str) -> Result<bool, DatabaseError>;
}

/// SQLite-backed [`JobRepository`].
#[derive(Clone)]
pub struct SqliteJobRepository {
    db: Database,
}

impl SqliteJobRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const NOT_TERMINAL: &str = "status NOT IN ('completed', 'failed', 'partial', 'cancelled')";

struct JobHeader {
    id: String,
    owner_id: String,
    workspace_id: Option<String>,
    status: String,
    total_documents: u32,
    processed_documents: u32,
    failed_documents: u32,
    options: String,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl JobHeader {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            workspace_id: row.get("workspace_id")?,
            status: row.get("status")?,
            total_documents: row.get("total_documents")?,
            processed_documents: row.get("processed_documents")?,
            failed_documents: row.get("failed_documents")?,
            options: row.get("options")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }

    fn into_job(self, documents: Vec<DocumentJobEntry>) -> Result<BatchJob, DatabaseError> {
        let options: BatchOptions = serde_json::from_str(&self.options)?;
        Ok(BatchJob {
            status: parse_column("batch_jobs.status", &self.status)?,
            created_at: parse_timestamp("batch_jobs.created_at", &self.created_at)?,
            updated_at: parse_timestamp("batch_jobs.updated_at", &self.updated_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(|ts| parse_timestamp("batch_jobs.completed_at", ts))
                .transpose()?,
            id: self.id,
            owner_id: self.owner_id,
            workspace_id: self.workspace_id,
            total_documents: self.total_documents,
            processed_documents: self.processed_documents,
            failed_documents: self.failed_documents,
            documents,
            options,
        })
    }
}

fn parse_column<T: std::str::FromStr>(
    column: &'static str,
    value: &str,
) -> Result<T, DatabaseError> {
    value.parse().map_err(|_| DatabaseError::InvalidColumn {
        column,
        value: value.to_string(),
    })
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidColumn {
            column,
            value: value.to_string(),
        })
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn load_documents(
    conn: &Connection,
    batch_id: &str,
) -> Result<Vec<DocumentJobEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT document_id, extraction_type, priority, status, extraction_id, error,
         processing_time_ms
         FROM batch_documents WHERE batch_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![batch_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<i64>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(
            |(document_id, extraction_type, priority, status, extraction_id, error, time)| {
                Ok(DocumentJobEntry {
                    document_id,
                    extraction_type: parse_column("batch_documents.extraction_type", &extraction_type)?,
                    priority: parse_column("batch_documents.priority", &priority)?,
                    status: parse_column("batch_documents.status", &status)?,
                    extraction_id,
                    error,
                    processing_time_ms: time.map(|ms| ms.max(0) as u64),
                })
            },
        )
        .collect()
}

fn load_job(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Option<BatchJob>, DatabaseError> {
    let header = conn.query_row(sql, args, JobHeader::from_row).optional()?;
    match header {
        Some(header) => {
            let documents = load_documents(conn, &header.id)?;
            Ok(Some(header.into_job(documents)?))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &BatchJob) -> Result<(), DatabaseError> {
        let options = serde_json::to_string(&job.options)?;
        let job = job.clone();
        self.db.call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO batch_jobs (id, owner_id, workspace_id, status, total_documents,
                 processed_documents, failed_documents, options, created_at, updated_at,
                 completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    job.id,
                    job.owner_id,
                    job.workspace_id,
                    job.status.as_str(),
                    job.total_documents,
                    job.processed_documents,
                    job.failed_documents,
                    options,
                    job.created_at.to_rfc3339(),
                    job.updated_at.to_rfc3339(),
                    job.completed_at.map(|ts| ts.to_rfc3339()),
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO batch_documents (batch_id, position, document_id,
                     extraction_type, priority, status, extraction_id, error, processing_time_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for (position, doc) in job.documents.iter().enumerate() {
                    stmt.execute(params![
                        job.id,
                        position as i64,
                        doc.document_id,
                        doc.extraction_type.as_str(),
                        doc.priority.as_str(),
                        doc.status.as_str(),
                        doc.extraction_id,
                        doc.error,
                        doc.processing_time_ms.map(|ms| ms as i64),
                    ])?;
                }
            }
            tx.commit()?;
            log::debug!("Inserted batch job {} ({} documents)", job.id, job.total_documents);
            Ok(())
        })
        .await
    }

    async fn find(&self, batch_id: &str) -> Result<Option<BatchJob>, DatabaseError> {
        let batch_id = batch_id.to_owned();
        self.db
            .call(move |conn| {
                load_job(conn, "SELECT * FROM batch_jobs WHERE id = ?1", params![batch_id])
            })
            .await
    }

    async fn find_for_owner(
        &self,
        batch_id: &str,
        owner_id: &str,
    ) -> Result<Option<BatchJob>, DatabaseError> {
        let (batch_id, owner_id) = (batch_id.to_owned(), owner_id.to_owned());
        self.db
            .call(move |conn| {
                load_job(
                    conn,
                    "SELECT * FROM batch_jobs WHERE id = ?1 AND owner_id = ?2",
                    params![batch_id, owner_id],
                )
            })
            .await
    }

    async fn mark_processing(&self, batch_id: &str) -> Result<bool, DatabaseError> {
        let batch_id = batch_id.to_owned();
        self.db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE batch_jobs SET status = 'processing', updated_at = ?2
                     WHERE id = ?1 AND status = 'queued'",
                    params![batch_id, now()],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    async fn mark_documents_processing(
        &self,
        batch_id: &str,
        positions: &[usize],
    ) -> Result<(), DatabaseError> {
        let batch_id = batch_id.to_owned();
        let positions = positions.to_vec();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "UPDATE batch_documents SET status = 'processing'
                         WHERE batch_id = ?1 AND position = ?2 AND status = 'pending'
                         AND EXISTS (SELECT 1 FROM batch_jobs
                                     WHERE id = ?1 AND status = 'processing')",
                    )?;
                    for position in positions {
                        stmt.execute(params![batch_id, position as i64])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    async fn record_window(
        &self,
        batch_id: &str,
        updates: &[DocumentUpdate],
    ) -> Result<bool, DatabaseError> {
        let succeeded = updates
            .iter()
            .filter(|u| u.status == DocumentStatus::Completed)
            .count() as u32;
        let failed = updates
            .iter()
            .filter(|u| u.status == DocumentStatus::Failed)
            .count() as u32;

        let batch_id = batch_id.to_owned();
        let updates = updates.to_vec();
        self.db.call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                &format!(
                    "UPDATE batch_jobs
                     SET processed_documents = processed_documents + ?2,
                         failed_documents = failed_documents + ?3,
                         updated_at = ?4
                     WHERE id = ?1 AND {}
                     AND processed_documents + failed_documents + ?2 + ?3 <= total_documents",
                    NOT_TERMINAL
                ),
                params![batch_id, succeeded, failed, now()],
            )?;
            if changed == 0 {
                // Dropping the transaction rolls it back.
                return Ok(false);
            }
            {
                let mut stmt = tx.prepare(
                    "UPDATE batch_documents
                     SET status = ?3, extraction_id = ?4, error = ?5, processing_time_ms = ?6
                     WHERE batch_id = ?1 AND position = ?2",
                )?;
                for update in &updates {
                    stmt.execute(params![
                        batch_id,
                        update.position as i64,
                        update.status.as_str(),
                        update.extraction_id,
                        update.error,
                        update.processing_time_ms as i64,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn finish(&self, batch_id: &str, status: BatchStatus) -> Result<bool, DatabaseError> {
        let batch_id = batch_id.to_owned();
        let ts = now();
        self.db
            .call(move |conn| {
                let changed = conn.execute(
                    &format!(
                        "UPDATE batch_jobs SET status = ?2, completed_at = ?3, updated_at = ?3
                         WHERE id = ?1 AND {}",
                        NOT_TERMINAL
                    ),
                    params![batch_id, status.as_str(), ts],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    async fn cancel(&self, batch_id: &str, owner_id: &str) -> Result<bool, DatabaseError> {
        let (batch_id, owner_id) = (batch_id.to_owned(), owner_id.to_owned());
        let ts = now();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE batch_jobs SET status = 'cancelled', completed_at = ?3, updated_at = ?3
                     WHERE id = ?1 AND owner_id = ?2 AND status IN ('queued', 'processing')",
                    params![batch_id, owner_id, ts],
                )?;
                if changed == 0 {
                    return Ok(false);
                }
                // In-flight entries will never be recorded.
                tx.execute(
                    "UPDATE batch_documents SET status = 'pending'
                     WHERE batch_id = ?1 AND status = 'processing'",
                    params![batch_id],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await
    }
}
