//! Pipeline configuration.
//!
//! Configuration is an explicit value threaded through constructors and
//! carried into every worker. There is no process-wide configuration
//! singleton: concurrent batches may run with different settings and must
//! not interfere through shared state.

use std::path::PathBuf;

/// Default SQLite database URL. `mode=rwc` creates the file if missing.
const DEFAULT_DATABASE_URL: &str = "sqlite:data/sluice.db?mode=rwc";

/// Default directory for processed output files.
const DEFAULT_OUTPUT_DIR: &str = "data/output";

/// Runtime configuration for the pipeline.
///
/// All fields have sensible defaults suitable for local development.
/// Override via environment variables or CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// SQLite database URL holding the work queue and step outputs.
    pub database_url: String,
    /// Directory where the parse step writes its output files.
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(database_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: database_url.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default                          |
    /// |----------------|----------------------------------|
    /// | `DATABASE_URL` | `sqlite:data/sluice.db?mode=rwc` |
    /// | `OUTPUT_DIR`   | `data/output`                    |
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());
        let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into());

        Self {
            database_url,
            output_dir: PathBuf::from(output_dir),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_URL, DEFAULT_OUTPUT_DIR)
    }
}
