//! Parallel executor: drains an explicit input list or the work queue
//! through a bounded pool of isolated workers.
//!
//! Each worker runs the full chain end-to-end for exactly one item, with its
//! own store handle and its own job instances. The dispatcher owns all queue
//! state: items are claimed before any worker starts, and finalized as each
//! outcome arrives in completion order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use sluice_core::{DbId, PipelineConfig, Timestamp};
use sluice_db::repositories::WorkItemRepo;
use sluice_db::DbPool;
use sluice_pipeline::{default_chain, run_chain, JobContext};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-item outcome, reported in completion order.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub file_path: String,
    pub success: bool,
    pub error: Option<String>,
    /// Compact rendering of the final step's output, when there is one.
    pub output: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
}

impl ItemOutcome {
    fn failed(file_path: String, error: String, started_at: Timestamp) -> Self {
        Self {
            file_path,
            success: false,
            error: Some(error),
            output: None,
            started_at,
            completed_at: Utc::now(),
        }
    }
}

/// Aggregated result of one parallel run. Read-only once returned;
/// `succeeded + failed == total` always holds.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ItemOutcome>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
}

impl BatchOutcome {
    fn empty(started_at: Timestamp) -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Success rate as a percentage; 0.0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }
}

/// Progress callback, invoked synchronously from the dispatcher once per
/// completed item with the running completed count and the batch total.
pub type ProgressFn<'a> = dyn Fn(usize, usize, &ItemOutcome) + Send + Sync + 'a;

/// Resolve the worker count.
///
/// `None` means use all available parallelism; an explicit request is
/// clamped to `[1, available]` — never more workers than the hardware
/// offers, never fewer than one.
pub fn effective_workers(requested: Option<usize>) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    match requested {
        None => available,
        Some(n) => n.clamp(1, available),
    }
}

/// An item handed to a worker; queue-sourced items carry their row id so the
/// dispatcher can finalize them.
struct DispatchItem {
    id: Option<DbId>,
    file_path: String,
}

/// Runs full-chain executions over many inputs with bounded parallelism.
pub struct ParallelExecutor {
    config: PipelineConfig,
    workers: usize,
}

impl ParallelExecutor {
    pub fn new(config: PipelineConfig, requested_workers: Option<usize>) -> Self {
        Self {
            config,
            workers: effective_workers(requested_workers),
        }
    }

    /// The resolved worker count for this executor.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the full chain over an explicit list of input files.
    ///
    /// An empty list returns an all-zero outcome without spawning anything.
    pub async fn run_files(
        &self,
        files: &[String],
        progress: Option<&ProgressFn<'_>>,
    ) -> BatchOutcome {
        let items = files
            .iter()
            .map(|file_path| DispatchItem {
                id: None,
                file_path: file_path.clone(),
            })
            .collect();
        self.dispatch(items, None, progress).await
    }

    /// Claim pending queue items and run the full chain over each.
    ///
    /// The whole batch is claimed in the caller's context before any worker
    /// starts, so other observers see every item as `processing` the moment
    /// dispatch begins. As outcomes arrive the dispatcher completes or fails
    /// each item on the queue.
    pub async fn run_queue(
        &self,
        pool: &DbPool,
        limit: Option<i64>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<BatchOutcome, sqlx::Error> {
        let claimed = WorkItemRepo::claim_batch(pool, limit).await?;
        tracing::info!(claimed = claimed.len(), "claimed work items for dispatch");

        let items = claimed
            .into_iter()
            .map(|item| DispatchItem {
                id: Some(item.id),
                file_path: item.file_path,
            })
            .collect();
        Ok(self.dispatch(items, Some(pool), progress).await)
    }

    async fn dispatch(
        &self,
        items: Vec<DispatchItem>,
        queue_pool: Option<&DbPool>,
        progress: Option<&ProgressFn<'_>>,
    ) -> BatchOutcome {
        let started_at = Utc::now();
        if items.is_empty() {
            return BatchOutcome::empty(started_at);
        }

        let total = items.len();
        tracing::info!(total, workers = self.workers, "dispatching batch");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks: JoinSet<ItemOutcome> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, DispatchItem> = HashMap::new();

        for item in items {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            let file_path = item.file_path.clone();
            let handle = tasks.spawn(async move {
                // The semaphore is never closed; a failed acquire would only
                // mean the limit is gone, so run unthrottled rather than die.
                let _permit = semaphore.acquire_owned().await.ok();
                run_single(config, file_path).await
            });
            in_flight.insert(handle.id(), item);
        }

        let mut outcome = BatchOutcome {
            total,
            succeeded: 0,
            failed: 0,
            results: Vec::with_capacity(total),
            started_at,
            completed_at: started_at,
        };
        let mut completed = 0usize;

        // Outcomes arrive in completion order, not submission order.
        while let Some(joined) = tasks.join_next_with_id().await {
            let (item, item_outcome) = match joined {
                Ok((task_id, item_outcome)) => (in_flight.remove(&task_id), item_outcome),
                Err(join_error) => {
                    // A panicked worker still yields a failed outcome for
                    // its item; the rest of the batch carries on.
                    let item = in_flight.remove(&join_error.id());
                    let file_path = item
                        .as_ref()
                        .map(|i| i.file_path.clone())
                        .unwrap_or_default();
                    tracing::error!(
                        file_path = %file_path,
                        error = %join_error,
                        "worker task failed",
                    );
                    (
                        item,
                        ItemOutcome::failed(
                            file_path,
                            format!("worker task failed: {join_error}"),
                            Utc::now(),
                        ),
                    )
                }
            };

            completed += 1;

            if let (Some(pool), Some(item_id)) = (queue_pool, item.as_ref().and_then(|i| i.id)) {
                finalize_queue_item(pool, item_id, &item_outcome).await;
            }

            if item_outcome.success {
                outcome.succeeded += 1;
            } else {
                outcome.failed += 1;
            }

            if let Some(callback) = progress {
                callback(completed, total, &item_outcome);
            }
            outcome.results.push(item_outcome);
        }

        outcome.completed_at = Utc::now();
        tracing::info!(
            total = outcome.total,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "batch complete",
        );
        outcome
    }
}

/// Worker body: one isolated end-to-end chain run.
///
/// The worker opens its own pool and builds its own job instances from its
/// own context copy — only the store and the filesystem are shared with the
/// dispatcher and sibling workers.
async fn run_single(config: PipelineConfig, file_path: String) -> ItemOutcome {
    let started_at = Utc::now();

    let pool = match sluice_db::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            return ItemOutcome::failed(file_path, format!("store unavailable: {e}"), started_at);
        }
    };

    let item_outcome = match default_chain() {
        Ok(chain) => {
            let ctx = JobContext::new(config, pool.clone());
            match run_chain(&chain, &ctx, Value::String(file_path.clone()), None, None).await {
                Ok(result) => ItemOutcome {
                    file_path,
                    success: result.success,
                    error: result.error,
                    output: result.output.map(|v| v.to_string()),
                    started_at,
                    completed_at: Utc::now(),
                },
                Err(e) => ItemOutcome::failed(
                    file_path,
                    format!("chain configuration error: {e}"),
                    started_at,
                ),
            }
        }
        Err(e) => ItemOutcome::failed(
            file_path,
            format!("chain configuration error: {e}"),
            started_at,
        ),
    };

    pool.close().await;
    item_outcome
}

/// Finalize a queue item from the dispatcher's context.
///
/// Store errors here are logged and swallowed — the item's computed outcome
/// stands either way, and the finalize path never fails the batch.
async fn finalize_queue_item(pool: &DbPool, item_id: DbId, outcome: &ItemOutcome) {
    let result = if outcome.success {
        WorkItemRepo::complete(pool, item_id, batch_id_of(outcome)).await
    } else {
        let message = outcome.error.as_deref().unwrap_or("unknown error");
        WorkItemRepo::fail(pool, item_id, message).await
    };
    if let Err(e) = result {
        tracing::warn!(item_id, error = %e, "could not finalize work item");
    }
}

/// Extract the finalize step's batch id from a successful chain output.
fn batch_id_of(outcome: &ItemOutcome) -> Option<DbId> {
    let output = outcome.output.as_deref()?;
    let value: Value = serde_json::from_str(output).ok()?;
    value.get("batch_id")?.as_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_workers_use_all_parallelism() {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(None), available);
    }

    #[test]
    fn requested_workers_are_clamped() {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(Some(0)), 1);
        assert_eq!(effective_workers(Some(1)), 1);
        assert_eq!(effective_workers(Some(available + 100)), available);
    }

    #[test]
    fn success_rate_handles_empty_batches() {
        let outcome = BatchOutcome::empty(Utc::now());
        assert_eq!(outcome.success_rate(), 0.0);
    }

    #[test]
    fn batch_id_is_read_from_finalize_output() {
        let outcome = ItemOutcome {
            file_path: "a.txt".into(),
            success: true,
            error: None,
            output: Some(r#"{"batch_id":7,"records_finalized":3,"status":"finalized"}"#.into()),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        };
        assert_eq!(batch_id_of(&outcome), Some(7));

        let no_output = ItemOutcome::failed("a.txt".into(), "boom".into(), Utc::now());
        assert_eq!(batch_id_of(&no_output), None);
    }
}
