//! Context window geometry and past/target/future splits.
//!
//! A [`WindowSpec`] fixes how many measures of past and future context
//! surround the target measures to be generated. Splitting is a pure,
//! order-preserving partition of a measure sequence; assembly is its exact
//! structural inverse.

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;
use crate::tensor::{flatten, MeasureBlock, TickTensor};

/// Measure-window geometry for context-conditioned infilling.
///
/// The reference configuration is 24 ticks per measure (4 beats at
/// subdivision 6), 6 past + 4 target + 6 future measures (16 measures,
/// 384 ticks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Ticks spanned by one measure.
    pub ticks_per_measure: usize,
    /// Measures of leading context held fixed.
    pub num_past: usize,
    /// Measures to generate.
    pub num_target: usize,
    /// Measures of trailing context held fixed.
    pub num_future: usize,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            ticks_per_measure: 24,
            num_past: 6,
            num_target: 4,
            num_future: 6,
        }
    }
}

impl WindowSpec {
    /// Creates a window spec with explicit geometry.
    pub fn new(
        ticks_per_measure: usize,
        num_past: usize,
        num_target: usize,
        num_future: usize,
    ) -> Self {
        Self {
            ticks_per_measure,
            num_past,
            num_target,
            num_future,
        }
    }

    /// Total measures covered by the window.
    pub fn num_measures(&self) -> usize {
        self.num_past + self.num_target + self.num_future
    }

    /// Ticks a tensor must span to fill the window.
    pub fn required_ticks(&self) -> usize {
        self.num_measures() * self.ticks_per_measure
    }

    /// Partitions a measure sequence into past, target, and future context.
    ///
    /// Past is the first `num_past` measures, future the last `num_future`,
    /// target the middle `num_target`. No measure is duplicated or dropped;
    /// ordering is preserved within each sub-sequence.
    ///
    /// # Errors
    ///
    /// [`ShapeError::MeasureCountMismatch`] if the sequence length differs
    /// from `num_measures()`.
    pub fn split_context(&self, measures: Vec<MeasureBlock>) -> Result<ContextSplit, ShapeError> {
        if measures.len() != self.num_measures() {
            return Err(ShapeError::MeasureCountMismatch {
                expected: self.num_measures(),
                actual: measures.len(),
            });
        }

        let mut measures = measures;
        let future = measures.split_off(self.num_past + self.num_target);
        let target = measures.split_off(self.num_past);
        let past = measures;

        Ok(ContextSplit {
            past,
            target,
            future,
        })
    }
}

/// A past/target/future partition of a measure sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSplit {
    /// Leading context measures.
    pub past: Vec<MeasureBlock>,
    /// Middle measures (ground truth for the region to be generated).
    pub target: Vec<MeasureBlock>,
    /// Trailing context measures.
    pub future: Vec<MeasureBlock>,
}

impl ContextSplit {
    /// Reassembles the full tensor with `target` substituted for the middle
    /// region.
    ///
    /// Concatenates past, `target`, future, in that fixed order, flattening
    /// each block back to raw ticks.
    pub fn assemble_with(&self, target: &[MeasureBlock]) -> TickTensor {
        assemble(&self.past, target, &self.future)
    }

    /// Reassembles the original tensor from the split's own measures.
    pub fn reassemble(&self) -> TickTensor {
        self.assemble_with(&self.target)
    }
}

/// Concatenates past, target, future measure groups into one tensor.
///
/// Pure structural inverse of segmentation: no data transformation occurs
/// beyond flattening.
pub fn assemble(
    past: &[MeasureBlock],
    target: &[MeasureBlock],
    future: &[MeasureBlock],
) -> TickTensor {
    let mut blocks = Vec::with_capacity(past.len() + target.len() + future.len());
    blocks.extend_from_slice(past);
    blocks.extend_from_slice(target);
    blocks.extend_from_slice(future);
    flatten(&blocks)
}
