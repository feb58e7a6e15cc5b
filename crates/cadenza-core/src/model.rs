//! Calling contracts for the pretrained measure codec and sequence generator.
//!
//! The neural models are external collaborators. This module fixes how they
//! are invoked: how context windows are handed over, what a generation call
//! returns, and which failures are per-call versus fatal to the run. A model
//! handle can only exist once its parameters have been loaded, so "forgot to
//! load" is unrepresentable; loading failures surface as
//! [`ModelError::MissingParameters`] before any piece is processed.

use rand::RngCore;
use thiserror::Error;

use crate::error::ShapeError;
use crate::tensor::MeasureBlock;
use crate::window::WindowSpec;

/// Error type for codec and generator invocations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Pretrained parameters absent or unreadable. Fatal at startup.
    #[error("model parameters missing at '{path}': {reason}")]
    MissingParameters {
        /// Path of the parameter artifact.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// Model invoked inconsistently with its loaded configuration. Indicates
    /// the pretrained model and the driver's window sizes disagree; fatal to
    /// the whole run.
    #[error("configuration mismatch: {0}")]
    ConfigMismatch(String),

    /// A tensor handed to the model had the wrong shape. Fatal to the single
    /// call only.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl ModelError {
    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::MissingParameters { .. } => "MODEL_001",
            ModelError::ConfigMismatch(_) => "MODEL_002",
            ModelError::Shape(err) => err.code(),
        }
    }

    /// True if the error must abort the whole run rather than one sample.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ModelError::Shape(_))
    }
}

/// Fixed-dimension latent vector for one measure.
///
/// Owned transiently during a single inference call, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentCode(pub Vec<f32>);

impl LatentCode {
    /// Dimensionality of the code.
    pub fn dim(&self) -> usize {
        self.0.len()
    }
}

/// How the generator treats the target region during a call.
///
/// Teacher forcing feeds the ground-truth target back step by step; it is an
/// offline-evaluation mode. Free-running feeds each generated measure forward
/// as context for the next and requires no ground truth. The tagged variant
/// makes a free-running call with a dangling ground truth unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationMode {
    /// Each generated measure feeds forward as context for the next.
    FreeRunning,
    /// Ground-truth target measures feed forward instead of the model's own
    /// output.
    TeacherForced {
        /// The true target measures, one per measure to generate.
        ground_truth: Vec<MeasureBlock>,
    },
}

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    /// Generated target measures, in order. Exactly `num_target` blocks of
    /// the window's tick width.
    pub target: Vec<MeasureBlock>,
    /// One row per generated measure: weights over the context measures
    /// (past first, then future). Auxiliary, informational only.
    pub attention: Vec<Vec<f32>>,
}

/// Maps a measure to and from its latent code. Pretrained.
pub trait MeasureCodec {
    /// Dimensionality of the latent space.
    fn latent_dim(&self) -> usize;

    /// Encodes one measure into a latent code.
    fn encode(&self, measure: &MeasureBlock) -> Result<LatentCode, ModelError>;

    /// Reconstructs a measure from a latent code.
    fn decode(&self, latent: &LatentCode) -> Result<MeasureBlock, ModelError>;
}

/// Generates target measures conditioned on past and future context.
/// Pretrained; parameters are read-only and shared across calls.
pub trait SequenceGenerator {
    /// The window geometry the generator was configured with.
    fn window(&self) -> WindowSpec;

    /// Runs one generation call.
    ///
    /// `past` and `future` must match the configured window's context
    /// lengths, otherwise [`ModelError::ConfigMismatch`]. In
    /// [`GenerationMode::TeacherForced`] the ground truth must contain
    /// exactly `num_target` measures. All randomness is drawn from `rng`;
    /// the same rng state and inputs produce identical output.
    fn generate(
        &self,
        past: &[MeasureBlock],
        future: &[MeasureBlock],
        mode: GenerationMode,
        num_target: usize,
        rng: &mut dyn RngCore,
    ) -> Result<GenerationOutput, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_codes() {
        let err = ModelError::MissingParameters {
            path: "weights/codec.json".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.code(), "MODEL_001");
        assert!(err.is_fatal());

        let err = ModelError::ConfigMismatch("past context of 5, configured for 6".to_string());
        assert_eq!(err.code(), "MODEL_002");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_shape_errors_are_per_call() {
        let err = ModelError::Shape(ShapeError::BlockWidthMismatch {
            expected: 24,
            actual: 23,
        });
        assert_eq!(err.code(), "SHAPE_003");
        assert!(!err.is_fatal());
    }
}
