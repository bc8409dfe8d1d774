//! Sequential runner: executes a chain range by threading each step's
//! output into the next step's input, short-circuiting on the first failure.

use chrono::Utc;
use serde_json::Value;

use crate::chain::{ChainDefinition, ChainError};
use crate::job::{JobContext, JobResult};

/// Run `chain` (or the inclusive `start..=stop` sub-range) over `initial`.
///
/// An empty resolved range is a valid no-op: the input passes through
/// unchanged as a successful result. Range resolution failures are
/// configuration misuse and surface as [`ChainError`]; a job failure is
/// returned inside the failing step's [`JobResult`] and no later step runs.
pub async fn run_chain(
    chain: &ChainDefinition,
    ctx: &JobContext,
    initial: Value,
    start: Option<&str>,
    stop: Option<&str>,
) -> Result<JobResult<Value>, ChainError> {
    let steps = chain.range(start, stop)?;

    if steps.is_empty() {
        tracing::warn!(chain = chain.name(), "no steps to run");
        return Ok(JobResult::ok(initial, Utc::now()));
    }

    let step_names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
    tracing::info!(chain = chain.name(), steps = ?step_names, "executing chain");

    let total = steps.len();
    let mut current = initial;

    for (i, spec) in steps.iter().enumerate() {
        tracing::info!(step = %spec.name, position = i + 1, total, "starting step");

        let job = spec.instantiate(ctx);
        let result = job.execute(&current).await;

        if !result.success {
            tracing::error!(
                step = %spec.name,
                error = result.error.as_deref().unwrap_or("unknown"),
                "chain stopped at failing step",
            );
            return Ok(result);
        }

        if i + 1 == total {
            tracing::info!(chain = chain.name(), "chain completed");
            return Ok(result);
        }

        // A successful result always carries an output; Null only defends
        // against a hand-rolled job that breaks that contract.
        current = result.output.unwrap_or(Value::Null);
    }

    unreachable!("non-empty ranges return from within the loop")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use sluice_core::{PipelineConfig, ValidationError};
    use sluice_db::DbPool;

    use super::*;
    use crate::chain::JobFactory;
    use crate::job::Job;

    /// Appends its tag to the input string, counting invocations; fails
    /// when built with `fail = true`.
    struct TagJob {
        tag: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Job for TagJob {
        fn name(&self) -> &str {
            self.tag
        }

        async fn validate(&self, raw: &Value) -> Result<Value, ValidationError> {
            match raw.as_str() {
                Some(_) => Ok(raw.clone()),
                None => Err(ValidationError::new("input", "expected a string")),
            }
        }

        async fn run(&self, input: Value) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("step {} exploded", self.tag);
            }
            let text = input.as_str().unwrap_or_default();
            Ok(json!(format!("{text}>{}", self.tag)))
        }
    }

    fn tag_factory(tag: &'static str, fail: bool, calls: Arc<AtomicUsize>) -> JobFactory {
        Arc::new(move |_ctx| {
            Box::new(TagJob {
                tag,
                fail,
                calls: calls.clone(),
            })
        })
    }

    async fn test_ctx() -> JobContext {
        // The test jobs never touch the store; any live pool will do.
        let pool: DbPool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        JobContext::new(PipelineConfig::new("sqlite::memory:", "/tmp"), pool)
    }

    struct Counters {
        a: Arc<AtomicUsize>,
        b: Arc<AtomicUsize>,
        c: Arc<AtomicUsize>,
    }

    fn abc_chain(fail_b: bool) -> (ChainDefinition, Counters) {
        let counters = Counters {
            a: Arc::new(AtomicUsize::new(0)),
            b: Arc::new(AtomicUsize::new(0)),
            c: Arc::new(AtomicUsize::new(0)),
        };
        let mut chain = ChainDefinition::new("test");
        chain
            .add("a", "", tag_factory("a", false, counters.a.clone()))
            .unwrap();
        chain
            .add("b", "", tag_factory("b", fail_b, counters.b.clone()))
            .unwrap();
        chain
            .add("c", "", tag_factory("c", false, counters.c.clone()))
            .unwrap();
        (chain, counters)
    }

    #[tokio::test]
    async fn output_threads_through_every_step() {
        let (chain, _) = abc_chain(false);
        let ctx = test_ctx().await;

        let result = run_chain(&chain, &ctx, json!("in"), None, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, Some(json!("in>a>b>c")));
    }

    #[tokio::test]
    async fn failure_short_circuits_later_steps() {
        let (chain, counters) = abc_chain(true);
        let ctx = test_ctx().await;

        let result = run_chain(&chain, &ctx, json!("in"), None, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("step b exploded"));
        assert_eq!(counters.a.load(Ordering::SeqCst), 1);
        assert_eq!(counters.b.load(Ordering::SeqCst), 1);
        assert_eq!(counters.c.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_step_range_runs_only_that_step() {
        let (chain, counters) = abc_chain(false);
        let ctx = test_ctx().await;

        let result = run_chain(&chain, &ctx, json!("mid"), Some("b"), Some("b"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, Some(json!("mid>b")));
        assert_eq!(counters.a.load(Ordering::SeqCst), 0);
        assert_eq!(counters.b.load(Ordering::SeqCst), 1);
        assert_eq!(counters.c.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_chain_passes_input_through() {
        let chain = ChainDefinition::new("empty");
        let ctx = test_ctx().await;

        let result = run_chain(&chain, &ctx, json!({"key": "value"}), None, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, Some(json!({"key": "value"})));
    }

    #[tokio::test]
    async fn unknown_step_is_a_configuration_error() {
        let (chain, _) = abc_chain(false);
        let ctx = test_ctx().await;

        let err = run_chain(&chain, &ctx, json!("in"), Some("zz"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::UnknownStep { .. }));
    }
}
