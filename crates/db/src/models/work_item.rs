//! Work queue row model.

use serde::Serialize;
use sluice_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `work_items` table.
///
/// The repository is the sole mutator of `status_id`; workers report
/// outcomes back to the dispatcher, which finalizes the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkItem {
    pub id: DbId,
    pub file_path: String,
    pub status_id: StatusId,
    /// Higher is more urgent; ties break on `created_at`, then `id`.
    pub priority: i64,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub result_batch_id: Option<DbId>,
}
