//! Step-output row models: a batch per persisted parse document, plus its
//! individual records.

use serde::Serialize;
use sluice_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `record_batches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecordBatch {
    pub id: DbId,
    pub source_file: String,
    pub status_id: StatusId,
    pub record_count: i64,
    pub created_at: Timestamp,
}

/// A row from the `records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredRecord {
    pub id: DbId,
    pub batch_id: DbId,
    pub name: String,
    pub value: String,
    pub processed_at: Timestamp,
    pub finalized: bool,
}

/// Input for inserting a record as part of a new batch.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub name: String,
    pub value: String,
}
