//! Score renderer contract.
//!
//! A renderer turns a reconstructed tick tensor into a persisted, playable
//! file. Serialization mechanics (MIDI, audio, notation) live behind this
//! trait; the driver only supplies the tensor and a deterministic base name.

use std::path::PathBuf;

use thiserror::Error;

use crate::tensor::TickTensor;

/// Error type for score rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tensor could not be encoded in the output format.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Persists a tick tensor as a playable file.
pub trait ScoreRenderer {
    /// Writes `tensor` under the given base name (extension is the
    /// renderer's choice) and returns the path written. Last write wins if
    /// the file already exists.
    fn render(&self, tensor: &TickTensor, name: &str) -> Result<PathBuf, RenderError>;
}
