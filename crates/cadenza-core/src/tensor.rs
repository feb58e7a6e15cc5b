//! Tick-tensor representation of monophonic melodies.
//!
//! A melody is a flat sequence of integer event codes, one per discrete time
//! tick at a fixed subdivision. Three kinds of codes exist: a note onset
//! (the MIDI pitch, `0..=127`), a continuation of the sounding note
//! ([`HOLD`]), and silence ([`REST`]). The tensor is the source of truth
//! throughout generation; MIDI is derived from it, never the other way
//! around.

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// Highest valid note-onset code (MIDI pitch).
pub const NOTE_MAX: u16 = 127;

/// Event code for continuation of the currently sounding note.
pub const HOLD: u16 = 128;

/// Event code for silence.
pub const REST: u16 = 129;

/// Size of the event vocabulary: 128 pitches + hold + rest.
pub const VOCAB_SIZE: usize = 130;

/// A melody as one event code per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTensor {
    codes: Vec<u16>,
}

impl TickTensor {
    /// Creates a tensor from raw event codes.
    pub fn new(codes: Vec<u16>) -> Self {
        Self { codes }
    }

    /// Number of ticks.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True if the tensor has no ticks.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The raw event codes.
    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    /// Consumes the tensor, returning its codes.
    pub fn into_codes(self) -> Vec<u16> {
        self.codes
    }

    /// Keeps exactly the first `num_ticks` ticks, discarding the remainder.
    ///
    /// Deterministic prefix truncation. A tensor shorter than `num_ticks` is
    /// returned unchanged; length filtering is the caller's concern.
    pub fn truncated(mut self, num_ticks: usize) -> Self {
        self.codes.truncate(num_ticks);
        self
    }
}

/// A contiguous sub-sequence of a tensor spanning exactly one measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureBlock {
    codes: Vec<u16>,
}

impl MeasureBlock {
    /// Creates a block from one measure's worth of event codes.
    pub fn new(codes: Vec<u16>) -> Self {
        Self { codes }
    }

    /// Width of the block in ticks.
    pub fn width(&self) -> usize {
        self.codes.len()
    }

    /// The block's event codes.
    pub fn codes(&self) -> &[u16] {
        &self.codes
    }
}

/// Splits a tensor into fixed-width measure blocks.
///
/// Concatenating the returned blocks in order reproduces the input exactly.
///
/// # Errors
///
/// [`ShapeError::NotMeasureAligned`] if the tensor length is not a multiple
/// of `ticks_per_measure`.
pub fn segment_into_measures(
    tensor: &TickTensor,
    ticks_per_measure: usize,
) -> Result<Vec<MeasureBlock>, ShapeError> {
    if ticks_per_measure == 0 || tensor.len() % ticks_per_measure != 0 {
        return Err(ShapeError::NotMeasureAligned {
            length: tensor.len(),
            ticks_per_measure,
        });
    }

    Ok(tensor
        .codes()
        .chunks_exact(ticks_per_measure)
        .map(|chunk| MeasureBlock::new(chunk.to_vec()))
        .collect())
}

/// Flattens a sequence of measure blocks back into one tensor.
pub fn flatten(blocks: &[MeasureBlock]) -> TickTensor {
    let total: usize = blocks.iter().map(MeasureBlock::width).sum();
    let mut codes = Vec::with_capacity(total);
    for block in blocks {
        codes.extend_from_slice(block.codes());
    }
    TickTensor::new(codes)
}
