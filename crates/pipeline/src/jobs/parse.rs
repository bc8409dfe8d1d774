//! Parse step: turn an input text file into a structured JSON document on
//! disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sluice_core::ValidationError;

use crate::job::Job;

/// File extensions the parse step accepts.
const ALLOWED_EXTENSIONS: [&str; 3] = ["txt", "csv", "json"];

/// Reads an input file, shapes each non-empty line into a record, and writes
/// the document to the output directory as `<stem>_processed.json`.
///
/// Output: the written document's path, consumable by the persist step.
pub struct ParseJob {
    output_dir: PathBuf,
}

impl ParseJob {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Job for ParseJob {
    fn name(&self) -> &str {
        "parse"
    }

    async fn validate(&self, raw: &Value) -> Result<Value, ValidationError> {
        let path_str = raw.as_str().ok_or_else(|| {
            ValidationError::new("file_path", format!("expected a file path string, got {raw}"))
        })?;
        let path = Path::new(path_str);

        let metadata = tokio::fs::metadata(path).await.map_err(|_| {
            ValidationError::new("file_path", format!("file does not exist: {path_str}"))
        })?;
        if !metadata.is_file() {
            return Err(ValidationError::new(
                "file_path",
                format!("path is not a file: {path_str}"),
            ));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext) => {}
            other => {
                return Err(ValidationError::new(
                    "file_path",
                    format!(
                        "invalid file extension {:?}, allowed: {:?}",
                        other.unwrap_or(""),
                        ALLOWED_EXTENSIONS
                    ),
                ));
            }
        }

        Ok(Value::String(path_str.to_string()))
    }

    async fn run(&self, input: Value) -> anyhow::Result<Value> {
        let path_str = input
            .as_str()
            .context("parse input must be a path string")?;
        let path = Path::new(path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {path_str}"))?;

        let body = content.trim();
        let lines: Vec<&str> = if body.is_empty() {
            Vec::new()
        } else {
            body.lines().collect()
        };

        let mut records = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            records.push(json!({
                "name": format!("record_{i}"),
                "value": trimmed,
                "line_number": i + 1,
            }));
        }

        let non_empty = records.len();
        let document = json!({
            "source_file": path_str,
            "records": records,
            "processed_at": Utc::now().to_rfc3339(),
            "total_lines": lines.len(),
            "non_empty_lines": non_empty,
        });

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating output dir {}", self.output_dir.display()))?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("input");
        let output_path = self.output_dir.join(format!("{stem}_processed.json"));
        tokio::fs::write(&output_path, serde_json::to_string_pretty(&document)?)
            .await
            .with_context(|| format!("writing {}", output_path.display()))?;

        tracing::debug!(
            source = path_str,
            output = %output_path.display(),
            records = non_empty,
            "parsed input file",
        );

        Ok(Value::String(output_path.to_string_lossy().into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_input(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        tokio::fs::write(&path, content).await.unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn parses_non_empty_lines_into_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "sample.txt", "alpha\n\n  beta  \n").await;
        let job = ParseJob::new(dir.path().join("out"));

        let result = job.execute(&Value::String(input.clone())).await;
        assert!(result.success, "{:?}", result.error);

        let output_path = result.output.unwrap();
        let written = tokio::fs::read_to_string(output_path.as_str().unwrap())
            .await
            .unwrap();
        let document: Value = serde_json::from_str(&written).unwrap();

        assert_eq!(document["source_file"], Value::String(input));
        assert_eq!(document["records"].as_array().unwrap().len(), 2);
        assert_eq!(document["records"][0]["value"], "alpha");
        assert_eq!(document["records"][1]["value"], "beta");
        assert_eq!(document["records"][1]["line_number"], 3);
        assert_eq!(document["non_empty_lines"], 2);
    }

    #[tokio::test]
    async fn output_file_is_named_after_the_input_stem() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "batch7.csv", "x\n").await;
        let job = ParseJob::new(dir.path().join("out"));

        let result = job.execute(&Value::String(input)).await;
        let output = result.output.unwrap();
        assert!(output.as_str().unwrap().ends_with("batch7_processed.json"));
    }

    #[tokio::test]
    async fn missing_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let job = ParseJob::new(dir.path());

        let result = job
            .execute(&Value::String("does/not/exist.txt".into()))
            .await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("does not exist"));
        assert_eq!(
            result.metadata.get("error_kind").map(String::as_str),
            Some("validation")
        );
    }

    #[tokio::test]
    async fn disallowed_extension_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "image.png", "binary").await;
        let job = ParseJob::new(dir.path());

        let result = job.execute(&Value::String(input)).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("extension"));
    }

    #[tokio::test]
    async fn non_string_input_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let job = ParseJob::new(dir.path());

        let result = job.execute(&json!(42)).await;
        assert!(!result.success);
    }
}
