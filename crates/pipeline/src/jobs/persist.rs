//! Persist step: write a parsed document's records to the store.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use sluice_core::ValidationError;
use sluice_db::models::NewRecord;
use sluice_db::repositories::BatchRepo;
use sluice_db::DbPool;

use crate::job::Job;

/// Fields a parsed document must carry.
const REQUIRED_FIELDS: [&str; 3] = ["source_file", "records", "processed_at"];

/// Inserts a record batch from a parse document — given inline or as a path
/// to the JSON file the parse step wrote.
///
/// Output: the new batch id, consumable by the finalize step.
pub struct PersistJob {
    pool: DbPool,
}

impl PersistJob {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Job for PersistJob {
    fn name(&self) -> &str {
        "persist"
    }

    async fn validate(&self, raw: &Value) -> Result<Value, ValidationError> {
        let document = match raw {
            // A path string points at the document the parse step wrote.
            Value::String(path_str) => {
                let path = Path::new(path_str);
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return Err(ValidationError::new(
                        "document",
                        format!("expected a .json document path, got: {path_str}"),
                    ));
                }
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ValidationError::new("document", format!("cannot read {path_str}: {e}"))
                })?;
                serde_json::from_str::<Value>(&content).map_err(|e| {
                    ValidationError::new("document", format!("invalid JSON in {path_str}: {e}"))
                })?
            }
            Value::Object(_) => raw.clone(),
            other => {
                return Err(ValidationError::new(
                    "document",
                    format!("expected an object or document path, got {other}"),
                ));
            }
        };

        for field in REQUIRED_FIELDS {
            if document.get(field).is_none() {
                return Err(ValidationError::new(
                    "document",
                    format!("missing required field '{field}'"),
                ));
            }
        }
        if !document["records"].is_array() {
            return Err(ValidationError::new(
                "document.records",
                "'records' must be an array",
            ));
        }

        Ok(document)
    }

    async fn run(&self, input: Value) -> anyhow::Result<Value> {
        let source_file = input["source_file"]
            .as_str()
            .context("'source_file' must be a string")?;
        let raw_records = input["records"]
            .as_array()
            .context("'records' must be an array")?;

        let mut records = Vec::with_capacity(raw_records.len());
        for (i, record) in raw_records.iter().enumerate() {
            let name = record
                .get("name")
                .and_then(Value::as_str)
                .with_context(|| format!("record {i} is missing 'name'"))?;
            let value = match record.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => anyhow::bail!("record {i} is missing 'value'"),
            };
            records.push(NewRecord {
                name: name.to_string(),
                value,
            });
        }

        let batch_id = BatchRepo::insert_batch(&self.pool, source_file, &records)
            .await
            .context("inserting record batch")?;

        tracing::debug!(batch_id, records = records.len(), "persisted record batch");

        Ok(json!(batch_id))
    }
}
