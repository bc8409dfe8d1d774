//! Repository for the `work_items` table — the durable work queue.
//!
//! Every status transition is a single SQL statement. SQLite executes each
//! statement atomically under the database write lock, so the claim's
//! select-and-transition cannot interleave with a concurrent claimer.

use chrono::Utc;
use sluice_core::types::DbId;

use crate::models::status::WorkItemStatus;
use crate::models::work_item::WorkItem;
use crate::DbPool;

/// Column list for `work_items` queries.
const COLUMNS: &str = "\
    id, file_path, status_id, priority, \
    created_at, started_at, completed_at, \
    error_message, result_batch_id";

/// Provides CRUD operations for the work queue.
pub struct WorkItemRepo;

impl WorkItemRepo {
    /// Create a new pending item. Returns the inserted row.
    pub async fn enqueue(
        pool: &DbPool,
        file_path: &str,
        priority: i64,
    ) -> Result<WorkItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO work_items (file_path, status_id, priority, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkItem>(&query)
            .bind(file_path)
            .bind(WorkItemStatus::Pending.id())
            .bind(priority)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Atomically claim up to `limit` pending items (all of them when
    /// `limit` is `None`), transitioning each to `processing` with
    /// `started_at` set in the same statement that selects it.
    ///
    /// Claim order is priority descending, then `created_at` ascending, then
    /// `id` ascending — the final tie-break keeps insertion order stable even
    /// when two items land on the same timestamp tick.
    pub async fn claim_batch(
        pool: &DbPool,
        limit: Option<i64>,
    ) -> Result<Vec<WorkItem>, sqlx::Error> {
        let query = format!(
            "UPDATE work_items \
             SET status_id = ?1, started_at = ?2 \
             WHERE id IN ( \
                 SELECT id FROM work_items \
                 WHERE status_id = ?3 \
                 ORDER BY priority DESC, created_at ASC, id ASC \
                 LIMIT ?4 \
             ) \
             RETURNING {COLUMNS}"
        );
        let mut claimed = sqlx::query_as::<_, WorkItem>(&query)
            .bind(WorkItemStatus::Processing.id())
            .bind(Utc::now())
            .bind(WorkItemStatus::Pending.id())
            // LIMIT -1 means unbounded in SQLite.
            .bind(limit.unwrap_or(-1))
            .fetch_all(pool)
            .await?;

        // RETURNING does not guarantee row order; restore claim order.
        claimed.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(claimed)
    }

    /// Mark an item completed, optionally linking the batch it produced.
    ///
    /// A missing row (already deleted) is logged and swallowed: this runs in
    /// the dispatcher's finalize path, which must not fail the batch.
    pub async fn complete(
        pool: &DbPool,
        item_id: DbId,
        result_batch_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            "UPDATE work_items \
             SET status_id = ?1, completed_at = ?2, result_batch_id = ?3 \
             WHERE id = ?4",
        )
        .bind(WorkItemStatus::Completed.id())
        .bind(Utc::now())
        .bind(result_batch_id)
        .bind(item_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(item_id, "complete: work item no longer exists");
        }
        Ok(())
    }

    /// Mark an item failed with an error message.
    ///
    /// Same missing-row policy as [`complete`](Self::complete).
    pub async fn fail(
        pool: &DbPool,
        item_id: DbId,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            "UPDATE work_items \
             SET status_id = ?1, completed_at = ?2, error_message = ?3 \
             WHERE id = ?4",
        )
        .bind(WorkItemStatus::Failed.id())
        .bind(Utc::now())
        .bind(error_message)
        .bind(item_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(item_id, "fail: work item no longer exists");
        }
        Ok(())
    }

    /// Reset every failed item back to pending, clearing its timestamps and
    /// error message. Returns the number of items reset.
    ///
    /// Operator-driven recovery: no check that the original failure cause
    /// has been addressed.
    pub async fn reset_failed(pool: &DbPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE work_items \
             SET status_id = ?1, started_at = NULL, completed_at = NULL, \
                 error_message = NULL \
             WHERE status_id = ?2",
        )
        .bind(WorkItemStatus::Pending.id())
        .bind(WorkItemStatus::Failed.id())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Find an item by its ID.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<WorkItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM work_items WHERE id = ?1");
        sqlx::query_as::<_, WorkItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List items with a given status, newest first.
    pub async fn list_by_status(
        pool: &DbPool,
        status: WorkItemStatus,
        limit: i64,
    ) -> Result<Vec<WorkItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM work_items \
             WHERE status_id = ?1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?2"
        );
        sqlx::query_as::<_, WorkItem>(&query)
            .bind(status.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// List the most recently enqueued items across all statuses.
    pub async fn list_recent(pool: &DbPool, limit: i64) -> Result<Vec<WorkItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM work_items \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?1"
        );
        sqlx::query_as::<_, WorkItem>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count items with a given status.
    pub async fn count_by_status(
        pool: &DbPool,
        status: WorkItemStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM work_items WHERE status_id = ?1")
            .bind(status.id())
            .fetch_one(pool)
            .await
    }

    /// Delete items with a given status (all items when `status` is `None`).
    /// Returns the number of rows deleted.
    pub async fn clear(
        pool: &DbPool,
        status: Option<WorkItemStatus>,
    ) -> Result<u64, sqlx::Error> {
        let result = match status {
            Some(status) => {
                sqlx::query("DELETE FROM work_items WHERE status_id = ?1")
                    .bind(status.id())
                    .execute(pool)
                    .await?
            }
            None => sqlx::query("DELETE FROM work_items").execute(pool).await?,
        };
        Ok(result.rows_affected())
    }
}
