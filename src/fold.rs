//! Folding a stream of samples into one schema.
//!
//! The first sample is taken as-is; every later one is merged in, so fields
//! missing from some samples pick up `Undefined`. Since merging is
//! associative and commutative, a balanced parallel reduction gives the same
//! tree as the left-to-right fold.
use rayon::prelude::*;
use serde_json::Value;

use crate::error::Result;
use crate::merge::{merge, validate};
use crate::parse::parse;
use crate::shape::SchemaNode;

const PROGRESS_EVERY: u64 = 100_000;

/// Parse a sample and check the one-object/one-array rule on all its sets.
pub fn parse_checked(sample: &Value) -> Result<SchemaNode> {
    let node = parse(sample)?;
    validate(&node)?;
    Ok(node)
}

/// Left fold over `nodes`; `None` when there is nothing to fold.
pub fn merge_all<I>(nodes: I) -> Result<Option<SchemaNode>>
where
    I: IntoIterator<Item = SchemaNode>,
{
    let mut acc = Accumulator::new();
    for node in nodes {
        acc.observe(node)?;
    }
    Ok(acc.state)
}

/// Balanced tree reduction on the rayon pool. Every intermediate merge
/// re-checks its inputs, so a bad sample fails here just as in `merge_all`.
pub fn merge_all_parallel(nodes: Vec<SchemaNode>) -> Result<Option<SchemaNode>> {
    nodes
        .into_par_iter()
        .map(|node| validate(&node).map(|()| node))
        .try_reduce_with(|a, b| merge(&a, &b))
        .transpose()
}

// ------------------------------- Front API -------------------------------- //

#[derive(Debug, Default)]
pub struct Accumulator {
    state: Option<SchemaNode>,
    samples: u64,
}

impl Accumulator {
    pub fn new() -> Self { Self::default() }

    /// Continue folding into a previously merged schema.
    pub fn seeded(base: SchemaNode) -> Result<Self> {
        validate(&base)?;
        Ok(Self { state: Some(base), samples: 0 })
    }

    pub fn observe_sample(&mut self, sample: &Value) -> Result<()> {
        let node = parse(sample)?;
        self.observe(node)
    }

    /// Merge `node` into the state. On error the state is left as it was.
    pub fn observe(&mut self, node: SchemaNode) -> Result<()> {
        let next = match &self.state {
            None => {
                validate(&node)?;
                node
            }
            Some(state) => merge(state, &node)?,
        };
        self.state = Some(next);
        self.samples += 1;
        if self.samples % PROGRESS_EVERY == 0 {
            log::info!("samples merged: {}", self.samples);
        }
        Ok(())
    }

    /// Samples merged so far (a seed does not count).
    pub fn samples(&self) -> u64 { self.samples }

    pub fn state(&self) -> Option<&SchemaNode> { self.state.as_ref() }

    pub fn finish(self) -> SchemaNode { self.state.unwrap_or_default() }
}

// ------------------------------- Tests ------------------------------------ //
