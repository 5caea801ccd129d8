//! Document and workspace lookups used for access checks.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A stored document as far as access control is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_id: String,
    pub workspace_id: Option<String>,
    pub filename: String,
}

impl DocumentRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            workspace_id: row.get("workspace_id")?,
            filename: row.get("filename")?,
        })
    }
}

/// Read-side view of documents and workspace membership.
#[async_trait]
pub trait DocumentAccess: Send + Sync {
    /// Returns the documents that exist among `ids`, in no particular order.
    async fn find_documents(&self, ids: &[String]) -> Result<Vec<DocumentRecord>, DatabaseError>;

    async fn find_document(&self, id: &str) -> Result<Option<DocumentRecord>, DatabaseError> {
        let found = self.find_documents(&[id.to_string()]).await?;
        Ok(found.into_iter().next())
    }

    async fn is_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<bool, DatabaseError>;

    async fn workspace_owner(&self, workspace_id: &str) -> Result<Option<String>, DatabaseError>;

    /// A user may read a document they own, or any document in a
    /// workspace they belong to or own.
    async fn can_read(
        &self,
        user_id: &str,
        document: &DocumentRecord,
    ) -> Result<bool, DatabaseError> {
        if document.owner_id == user_id {
            return Ok(true);
        }
        match document.workspace_id.as_deref() {
            Some(workspace_id) => {
                if self.is_workspace_member(workspace_id, user_id).await? {
                    return Ok(true);
                }
                let owner = self.workspace_owner(workspace_id).await?;
                Ok(owner.as_deref() == Some(user_id))
            }
            None => Ok(false),
        }
    }
}

/// SQLite-backed [`DocumentAccess`].
#[derive(Clone)]
pub struct SqliteDocumentAccess {
    db: Database,
}

impl SqliteDocumentAccess {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentAccess for SqliteDocumentAccess {
    async fn find_documents(&self, ids: &[String]) -> Result<Vec<DocumentRecord>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        self.db
            .call(move |conn| {
                let placeholders: Vec<String> =
                    (1..=ids.len()).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "SELECT id, owner_id, workspace_id, filename FROM documents WHERE id IN ({})",
                    placeholders.join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(ids.iter()), DocumentRecord::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    async fn is_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<bool, DatabaseError> {
        let (workspace_id, user_id) = (workspace_id.to_owned(), user_id.to_owned());
        self.db
            .call(move |conn| {
                let count: u32 = conn.query_row(
                    "SELECT COUNT(*) FROM workspace_members
                     WHERE workspace_id = ?1 AND user_id = ?2",
                    params![workspace_id, user_id],
                    |r| r.get(0),
                )?;
                Ok(count > 0)
            })
            .await
    }

    async fn workspace_owner(&self, workspace_id: &str) -> Result<Option<String>, DatabaseError> {
        let workspace_id = workspace_id.to_owned();
        self.db
            .call(move |conn| {
                let owner = conn
                    .query_row(
                        "SELECT owner_id FROM workspaces WHERE id = ?1",
                        params![workspace_id],
                        |r| r.get(0),
                    )
                    .optional()?;
                Ok(owner)
            })
            .await
    }
}

/// Inserts a workspace row.
pub fn insert_workspace(
    db: &Database,
    id: &str,
    owner_id: &str,
    name: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO workspaces (id, owner_id, name) VALUES (?1, ?2, ?3)",
            params![id, owner_id, name],
        )?;
        Ok(())
    })
}

/// Adds a user to a workspace. Re-adding an existing member is a no-op.
pub fn add_workspace_member(
    db: &Database,
    workspace_id: &str,
    user_id: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO workspace_members (workspace_id, user_id) VALUES (?1, ?2)",
            params![workspace_id, user_id],
        )?;
        Ok(())
    })
}

/// Inserts a document row.
pub fn insert_document(db: &Database, document: &DocumentRecord) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, owner_id, workspace_id, filename) VALUES (?1, ?2, ?3, ?4)",
            params![
                document.id,
                document.owner_id,
                document.workspace_id,
                document.filename
            ],
        )?;
        Ok(())
    })
}
