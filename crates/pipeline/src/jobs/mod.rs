//! The stock jobs: parse -> persist -> finalize.

pub mod finalize;
pub mod parse;
pub mod persist;

use std::sync::Arc;

pub use finalize::FinalizeJob;
pub use parse::ParseJob;
pub use persist::PersistJob;

use crate::chain::{ChainDefinition, ChainError};

/// Build the stock chain. Each factory pulls what it needs from the worker's
/// own context, so every worker gets its own job instances and store handle.
pub fn default_chain() -> Result<ChainDefinition, ChainError> {
    let mut chain = ChainDefinition::new("default");

    chain.add(
        "parse",
        "Parse an input file into structured records",
        Arc::new(|ctx| Box::new(ParseJob::new(ctx.config.output_dir.clone()))),
    )?;
    chain.add(
        "persist",
        "Write parsed records to the store",
        Arc::new(|ctx| Box::new(PersistJob::new(ctx.pool.clone()))),
    )?;
    chain.add(
        "finalize",
        "Finalize the persisted record batch",
        Arc::new(|ctx| Box::new(FinalizeJob::new(ctx.pool.clone()))),
    )?;

    Ok(chain)
}
