//! Job-chain execution engine: the job contract, the ordered chain
//! registry, and the sequential runner.
//!
//! A chain is an ordered, named sequence of jobs. Callers run the whole
//! chain or any inclusive sub-range, threading each step's output into the
//! next step's input. Job failures are contained as [`JobResult`] values;
//! only chain-configuration mistakes surface as [`ChainError`].

pub mod chain;
pub mod job;
pub mod jobs;
pub mod runner;

pub use chain::{ChainDefinition, ChainError, JobFactory, JobSpec};
pub use job::{Job, JobContext, JobResult};
pub use jobs::default_chain;
pub use runner::run_chain;
