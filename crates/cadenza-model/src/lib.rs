//! Cadenza Model Backend - Measure Codec and Context-Conditioned Sampler
//!
//! Concrete implementations of the model contracts in `cadenza-core`:
//!
//! - [`EmbeddingCodec`]: maps measures to and from fixed-dimension latent
//!   codes via a pretrained per-event embedding table and a prototype
//!   codebook.
//! - [`LatentSampler`]: a deterministic, seeded generator honoring the
//!   free-running / teacher-forced calling contract. It blends a pretrained
//!   event-transition prior with transitions observed in the context
//!   measures and samples the target tick by tick.
//!
//! Neural inference internals are out of scope here; the sampler is a
//! reference backend, and heavier model backends plug in through the same
//! `SequenceGenerator` trait.
//!
//! # Loading
//!
//! Model handles can only be constructed through fallible `load` (or
//! `from_params`) calls, so an unloaded codec or generator cannot exist as a
//! value. Absent or unreadable parameter files fail fast with
//! `ModelError::MissingParameters`; dimension disagreements fail with
//! `ModelError::ConfigMismatch`.
//!
//! # Modules
//!
//! - [`config`]: Model dimensionality configuration
//! - [`params`]: On-disk pretrained parameter artifacts
//! - [`codec`]: The embedding measure codec
//! - [`sampler`]: The context-conditioned sampler

pub mod codec;
pub mod config;
pub mod params;
pub mod sampler;

pub use codec::EmbeddingCodec;
pub use config::ModelConfig;
pub use params::{CodecParams, SamplerParams};
pub use sampler::LatentSampler;
