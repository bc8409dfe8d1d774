//! Ordered, named job registry with range slicing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::job::{Job, JobContext};

/// Builds a job instance from a worker's context.
///
/// Factories are how the chain stays heterogeneous without an inheritance
/// hierarchy: the registry maps a step name to a closure producing a boxed
/// [`Job`], and every worker instantiates its own copies.
pub type JobFactory = Arc<dyn Fn(&JobContext) -> Box<dyn Job> + Send + Sync>;

/// Specification for a single step in a chain.
#[derive(Clone)]
pub struct JobSpec {
    pub name: String,
    pub description: String,
    factory: JobFactory,
}

impl JobSpec {
    /// Build this step's job for the given context.
    pub fn instantiate(&self, ctx: &JobContext) -> Box<dyn Job> {
        (self.factory)(ctx)
    }
}

impl std::fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Chain configuration errors.
///
/// The only error kind that propagates to the caller of the chain API —
/// distinct from a job failure, which is always contained in a `JobResult`.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("step '{name}' already exists in chain")]
    DuplicateStep { name: String },

    #[error("unknown step '{name}', available steps: {available:?}")]
    UnknownStep {
        name: String,
        available: Vec<String>,
    },

    #[error(
        "start step '{start}' (index {start_index}) must not come after \
         stop step '{stop}' (index {stop_index})"
    )]
    InvalidRange {
        start: String,
        start_index: usize,
        stop: String,
        stop_index: usize,
    },
}

/// An ordered, named sequence of jobs.
///
/// Insertion order is execution order. Slicing a contiguous sub-range by
/// step name is what lets callers start mid-chain or stop early without the
/// chain needing separate partial definitions.
#[derive(Debug)]
pub struct ChainDefinition {
    name: String,
    specs: Vec<JobSpec>,
    index: HashMap<String, usize>,
}

impl ChainDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a step. Fails when the name is already taken.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        factory: JobFactory,
    ) -> Result<&mut Self, ChainError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(ChainError::DuplicateStep { name });
        }

        self.index.insert(name.clone(), self.specs.len());
        self.specs.push(JobSpec {
            name,
            description: description.into(),
            factory,
        });
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Ordered step names.
    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// First step name, if any.
    pub fn first(&self) -> Option<&str> {
        self.specs.first().map(|s| s.name.as_str())
    }

    /// Last step name, if any.
    pub fn last(&self) -> Option<&str> {
        self.specs.last().map(|s| s.name.as_str())
    }

    /// Position of a step by name.
    pub fn index_of(&self, name: &str) -> Result<usize, ChainError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ChainError::UnknownStep {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// The inclusive contiguous sub-range from `start` to `stop`.
    ///
    /// Omitted bounds resolve to the first/last step. An empty chain yields
    /// an empty slice regardless of bounds.
    pub fn range(
        &self,
        start: Option<&str>,
        stop: Option<&str>,
    ) -> Result<&[JobSpec], ChainError> {
        if self.specs.is_empty() {
            return Ok(&[]);
        }

        let start_index = match start {
            Some(name) => self.index_of(name)?,
            None => 0,
        };
        let stop_index = match stop {
            Some(name) => self.index_of(name)?,
            None => self.specs.len() - 1,
        };

        if start_index > stop_index {
            return Err(ChainError::InvalidRange {
                start: self.specs[start_index].name.clone(),
                start_index,
                stop: self.specs[stop_index].name.clone(),
                stop_index,
            });
        }

        Ok(&self.specs[start_index..=stop_index])
    }
}
