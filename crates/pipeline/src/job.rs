//! The job contract: validate, run, and the uniform error-containment
//! boundary around both.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sluice_core::{PipelineConfig, Timestamp, ValidationError};
use sluice_db::DbPool;

/// Everything a job factory needs to build a job instance.
///
/// Each worker carries its own context with its own pool; contexts are never
/// shared between workers, only cloned into them.
#[derive(Clone)]
pub struct JobContext {
    pub config: PipelineConfig,
    pub pool: DbPool,
}

impl JobContext {
    pub fn new(config: PipelineConfig, pool: DbPool) -> Self {
        Self { config, pool }
    }
}

/// Result wrapper for a single job invocation.
///
/// Exactly one of `output`/`error` is populated, matching `success`.
/// Immutable once returned from `execute`.
#[derive(Debug, Clone)]
pub struct JobResult<T> {
    pub success: bool,
    pub output: Option<T>,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

impl<T> JobResult<T> {
    /// A successful result completed now.
    pub fn ok(output: T, started_at: Timestamp) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            started_at,
            completed_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// A failed result completed now.
    pub fn err(error: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            started_at,
            completed_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A single unit of work.
///
/// `validate` checks the raw input's shape and existence constraints and
/// yields the job's typed input; `run` performs the effect and is never
/// invoked when validation failed. Steps exchange `serde_json::Value`;
/// whether step N's output matches step N+1's expected input is a
/// chain-configuration contract enforced by tests, not by the runner.
#[async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs and result metadata.
    fn name(&self) -> &str;

    async fn validate(&self, raw: &Value) -> Result<Value, ValidationError>;

    async fn run(&self, input: Value) -> anyhow::Result<Value>;

    /// Execute with validation and error containment.
    ///
    /// This is the system's uniform boundary: any failure from `validate` or
    /// `run` becomes a failed [`JobResult`] instead of propagating into the
    /// runner as a fault.
    async fn execute(&self, raw: &Value) -> JobResult<Value> {
        let started_at = Utc::now();

        let input = match self.validate(raw).await {
            Ok(input) => input,
            Err(e) => {
                return JobResult::err(e.to_string(), started_at)
                    .with_metadata("job", self.name())
                    .with_metadata("error_kind", "validation");
            }
        };

        match self.run(input).await {
            Ok(output) => JobResult::ok(output, started_at).with_metadata("job", self.name()),
            Err(e) => JobResult::err(format!("{e:#}"), started_at)
                .with_metadata("job", self.name())
                .with_metadata("error_kind", "execution"),
        }
    }
}
