//! `MessageStore` trait: the read/write interface to the local message cache.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;

/// An immutable snapshot of one cached message.
///
/// `received_at` is the raw `Date` header text and may be empty or malformed;
/// `label_ids` is the comma-joined label id list captured at fetch time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub received_at: String,
    pub label_ids: String,
}

/// Backend-agnostic message cache.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create or upgrade the schema.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Insert a record, replacing any existing row with the same id.
    async fn upsert_message(&self, record: &MessageRecord) -> Result<(), DatabaseError>;

    /// All cached records in the store's native order.
    async fn fetch_all(&self) -> Result<Vec<MessageRecord>, DatabaseError>;

    /// Number of cached records.
    async fn count(&self) -> Result<usize, DatabaseError>;
}
