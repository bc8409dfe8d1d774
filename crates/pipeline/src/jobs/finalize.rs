//! Finalize step: close out a persisted record batch.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use sluice_core::{DbId, ValidationError};
use sluice_db::models::BatchStatus;
use sluice_db::repositories::BatchRepo;
use sluice_db::DbPool;

use crate::job::Job;

/// Marks every record in a batch finalized and the batch itself
/// `finalized`. Only runs against a batch the persist step completed.
///
/// Output: `{ batch_id, records_finalized, status }`.
pub struct FinalizeJob {
    pool: DbPool,
}

impl FinalizeJob {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn parse_batch_id(raw: &Value) -> Option<DbId> {
        match raw {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl Job for FinalizeJob {
    fn name(&self) -> &str {
        "finalize"
    }

    async fn validate(&self, raw: &Value) -> Result<Value, ValidationError> {
        let batch_id = Self::parse_batch_id(raw).ok_or_else(|| {
            ValidationError::new("batch_id", format!("expected an integer batch id, got {raw}"))
        })?;
        if batch_id < 1 {
            return Err(ValidationError::new(
                "batch_id",
                format!("batch id must be positive, got {batch_id}"),
            ));
        }

        let batch = BatchRepo::find_by_id(&self.pool, batch_id)
            .await
            .map_err(|e| ValidationError::new("batch_id", format!("store lookup failed: {e}")))?
            .ok_or_else(|| {
                ValidationError::new("batch_id", format!("batch {batch_id} does not exist"))
            })?;

        if batch.status_id != BatchStatus::Completed.id() {
            return Err(ValidationError::new(
                "batch_id",
                format!(
                    "batch {batch_id} is not ready (status id {})",
                    batch.status_id
                ),
            ));
        }
        if batch.record_count == 0 {
            return Err(ValidationError::new(
                "batch_id",
                format!("batch {batch_id} has no records to finalize"),
            ));
        }

        Ok(json!(batch_id))
    }

    async fn run(&self, input: Value) -> anyhow::Result<Value> {
        let batch_id = input.as_i64().context("finalize input must be a batch id")?;

        let records_finalized = BatchRepo::finalize_batch(&self.pool, batch_id)
            .await
            .context("finalizing record batch")?;

        tracing::debug!(batch_id, records_finalized, "finalized record batch");

        Ok(json!({
            "batch_id": batch_id,
            "records_finalized": records_finalized,
            "status": "finalized",
        }))
    }
}
