//! libSQL backend, the async `MessageStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{MessageRecord, MessageStore};

/// libSQL message cache.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Message cache opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

const EMAIL_COLUMNS: &str = "id, from_email, to_email, subject, body, date_received, label_ids";

/// Map a libsql Row to a MessageRecord. NULL text columns read as empty.
fn row_to_record(row: &libsql::Row) -> Result<MessageRecord, libsql::Error> {
    let text = |idx: i32| row.get::<String>(idx).unwrap_or_default();
    Ok(MessageRecord {
        id: row.get(0)?,
        from_address: text(1),
        to_address: text(2),
        subject: text(3),
        body: text(4),
        received_at: text(5),
        label_ids: text(6),
    })
}

#[async_trait]
impl MessageStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn upsert_message(&self, record: &MessageRecord) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO emails ({EMAIL_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    record.id.as_str(),
                    record.from_address.as_str(),
                    record.to_address.as_str(),
                    record.subject.as_str(),
                    record.body.as_str(),
                    record.received_at.as_str(),
                    record.label_ids.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_message: {e}")))?;

        debug!(id = %record.id, "Message cached");
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<MessageRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails ORDER BY rowid ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("fetch_all: {e}")))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_record(&row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping email row: {e}");
                }
            }
        }
        Ok(records)
    }

    async fn count(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM emails", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count parse: {e}")))?;
                Ok(usize::try_from(count).unwrap_or(0))
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn make_record(id: &str, subject: &str) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            from_address: "Alice <alice@example.com>".into(),
            to_address: "bob@example.com".into(),
            subject: subject.into(),
            body: "Hello there".into(),
            received_at: "Wed, 20 Nov 2024 10:00:00 +0530".into(),
            label_ids: "INBOX,UNREAD".into(),
        }
    }

    #[tokio::test]
    async fn upsert_and_fetch_all() {
        let db = test_db().await;
        db.upsert_message(&make_record("m1", "First")).await.unwrap();
        db.upsert_message(&make_record("m2", "Second")).await.unwrap();

        let all = db.fetch_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], make_record("m1", "First"));
        assert_eq!(all[1].subject, "Second");
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let db = test_db().await;
        db.upsert_message(&make_record("m1", "Old subject"))
            .await
            .unwrap();
        db.upsert_message(&make_record("m1", "New subject"))
            .await
            .unwrap();

        let all = db.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "New subject");
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn null_columns_read_as_empty() {
        let db = test_db().await;
        db.conn()
            .execute("INSERT INTO emails (id, subject) VALUES ('bare', 'Only subject')", ())
            .await
            .unwrap();

        let all = db.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "Only subject");
        assert_eq!(all[0].body, "");
        assert_eq!(all[0].received_at, "");
        assert_eq!(all[0].label_ids, "");
    }

    #[tokio::test]
    async fn empty_store() {
        let db = test_db().await;
        assert!(db.fetch_all().await.unwrap().is_empty());
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn new_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("emails.db");
        let db = LibSqlBackend::new_local(&db_path).await.unwrap();
        db.upsert_message(&make_record("m1", "Persisted"))
            .await
            .unwrap();
        assert!(db_path.exists());
    }
}
