//! Repository for `record_batches` and `records` — step-output storage
//! written by the persist step and closed out by the finalize step.

use chrono::Utc;
use sluice_core::types::DbId;

use crate::models::batch::{NewRecord, RecordBatch, StoredRecord};
use crate::models::status::BatchStatus;
use crate::DbPool;

/// Column list for `record_batches` queries.
const BATCH_COLUMNS: &str = "id, source_file, status_id, record_count, created_at";

/// Column list for `records` queries.
const RECORD_COLUMNS: &str = "id, batch_id, name, value, processed_at, finalized";

/// Provides CRUD operations for record batches.
pub struct BatchRepo;

impl BatchRepo {
    /// Insert a batch and all of its records in one transaction.
    ///
    /// The batch is created `processing`, filled, then flipped to
    /// `completed` with its final record count — a reader never observes a
    /// half-written completed batch. Returns the new batch id.
    pub async fn insert_batch(
        pool: &DbPool,
        source_file: &str,
        records: &[NewRecord],
    ) -> Result<DbId, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let batch_id: DbId = sqlx::query_scalar(
            "INSERT INTO record_batches (source_file, status_id, record_count, created_at) \
             VALUES (?1, ?2, 0, ?3) \
             RETURNING id",
        )
        .bind(source_file)
        .bind(BatchStatus::Processing.id())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for record in records {
            sqlx::query(
                "INSERT INTO records (batch_id, name, value, processed_at, finalized) \
                 VALUES (?1, ?2, ?3, ?4, 0)",
            )
            .bind(batch_id)
            .bind(&record.name)
            .bind(&record.value)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE record_batches SET record_count = ?1, status_id = ?2 WHERE id = ?3")
            .bind(records.len() as i64)
            .bind(BatchStatus::Completed.id())
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(batch_id)
    }

    /// Find a batch by its ID.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<RecordBatch>, sqlx::Error> {
        let query = format!("SELECT {BATCH_COLUMNS} FROM record_batches WHERE id = ?1");
        sqlx::query_as::<_, RecordBatch>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark every unfinalized record in the batch finalized and the batch
    /// itself `finalized`. Returns the number of records finalized.
    pub async fn finalize_batch(pool: &DbPool, batch_id: DbId) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let finalized = sqlx::query(
            "UPDATE records SET finalized = 1 WHERE batch_id = ?1 AND finalized = 0",
        )
        .bind(batch_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("UPDATE record_batches SET status_id = ?1 WHERE id = ?2")
            .bind(BatchStatus::Finalized.id())
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(finalized)
    }

    /// List a batch's records in insertion order.
    pub async fn list_records(
        pool: &DbPool,
        batch_id: DbId,
    ) -> Result<Vec<StoredRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE batch_id = ?1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, StoredRecord>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// Count finalized records in a batch.
    pub async fn count_finalized(pool: &DbPool, batch_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE batch_id = ?1 AND finalized = 1")
            .bind(batch_id)
            .fetch_one(pool)
            .await
    }
}
