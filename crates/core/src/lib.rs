//! Shared types, configuration, and errors for the sluice pipeline crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::PipelineConfig;
pub use error::ValidationError;
pub use types::{DbId, Timestamp};
