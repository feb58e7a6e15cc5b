//! Cadenza Core - Measure-Level Melody Infilling
//!
//! This crate provides the data model and orchestration logic for conditional
//! infilling of symbolic melodies: a block of "past" measures and a block of
//! "future" measures are held fixed, and a pretrained measure-level sequence
//! model generates the "target" measures that bridge them.
//!
//! # Overview
//!
//! Melodies are represented as [`TickTensor`]s: one integer event code per
//! discrete time tick at a fixed subdivision. A tensor is segmented into
//! fixed-width [`MeasureBlock`]s, partitioned into past/target/future context
//! by a [`WindowSpec`], run through a [`SequenceGenerator`], and reassembled
//! into a full-length tensor that a [`ScoreRenderer`] persists.
//!
//! The neural models themselves are external collaborators behind traits:
//! this crate specifies their calling contracts and owns everything around
//! them (segmentation, context windows, reassembly, the generation driver,
//! and the error taxonomy).
//!
//! # Example
//!
//! ```
//! use cadenza_core::{segment_into_measures, TickTensor, WindowSpec, REST};
//!
//! let window = WindowSpec::default(); // 24 ticks/measure, 6 past, 4 target, 6 future
//! let tensor = TickTensor::new(vec![REST; window.required_ticks()]);
//!
//! let measures = segment_into_measures(&tensor, window.ticks_per_measure).unwrap();
//! let split = window.split_context(measures).unwrap();
//! assert_eq!(split.past.len(), 6);
//! assert_eq!(split.target.len(), 4);
//! assert_eq!(split.future.len(), 6);
//! ```
//!
//! # Modules
//!
//! - [`tensor`]: Tick-tensor representation and measure segmentation
//! - [`window`]: Context window geometry and past/target/future splits
//! - [`model`]: Calling contracts for the measure codec and sequence generator
//! - [`dataset`]: Dataset provider contract
//! - [`render`]: Score renderer contract
//! - [`driver`]: The generation driver over a corpus
//! - [`error`]: Shape error taxonomy

pub mod dataset;
pub mod driver;
pub mod error;
pub mod model;
pub mod render;
pub mod tensor;
pub mod window;

// Re-export commonly used types at the crate root
pub use dataset::{DatasetError, DatasetProvider};
pub use driver::{GenerationDriver, PieceOutcome, RunConfig, RunMode, RunReport};
pub use error::ShapeError;
pub use model::{
    GenerationMode, GenerationOutput, LatentCode, MeasureCodec, ModelError, SequenceGenerator,
};
pub use render::{RenderError, ScoreRenderer};
pub use tensor::{segment_into_measures, MeasureBlock, TickTensor, HOLD, NOTE_MAX, REST, VOCAB_SIZE};
pub use window::{assemble, ContextSplit, WindowSpec};

/// Crate version for backend identification.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
