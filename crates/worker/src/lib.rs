//! Parallel execution overlay: a bounded worker pool driving the sequential
//! runner per item, plus the `sluice` command-line binary.

pub mod cli;
pub mod executor;

pub use executor::{effective_workers, BatchOutcome, ItemOutcome, ParallelExecutor};
