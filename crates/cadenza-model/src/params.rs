//! On-disk pretrained parameter artifacts.
//!
//! Parameters are JSON documents exported by the training pipeline. Loading
//! is the only way to obtain them inside a model handle; a missing or
//! unreadable file surfaces as `ModelError::MissingParameters` before any
//! piece is processed.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use cadenza_core::{ModelError, REST, VOCAB_SIZE};

/// Pretrained parameters of the measure codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecParams {
    /// Dimensionality of the latent space.
    pub latent_dim: usize,
    /// Ticks spanned by one measure.
    pub ticks_per_measure: usize,
    /// One embedding row per event code; `VOCAB_SIZE` rows of `latent_dim`.
    pub embeddings: Vec<Vec<f32>>,
    /// Prototype measures for nearest-neighbor decoding, each
    /// `ticks_per_measure` codes wide.
    pub codebook: Vec<Vec<u16>>,
}

impl CodecParams {
    /// Loads codec parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        load_json(path)
    }

    /// A minimal synthetic parameter set for smoke runs and tests.
    ///
    /// Embeddings are a fixed pseudo-random table; the codebook holds an
    /// all-rest prototype plus one sustained note per octave.
    pub fn synthetic(latent_dim: usize, ticks_per_measure: usize) -> Self {
        let embeddings = (0..VOCAB_SIZE)
            .map(|code| {
                (0..latent_dim)
                    .map(|j| ((code * 31 + j * 7) % 97) as f32 / 97.0)
                    .collect()
            })
            .collect();

        let mut codebook = vec![vec![REST; ticks_per_measure]];
        for octave in 0..8u16 {
            let pitch = 24 + octave * 12;
            let mut measure = vec![cadenza_core::HOLD; ticks_per_measure];
            measure[0] = pitch;
            codebook.push(measure);
        }

        Self {
            latent_dim,
            ticks_per_measure,
            embeddings,
            codebook,
        }
    }
}

/// Pretrained parameters of the context-conditioned sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerParams {
    /// Event-transition prior over the vocabulary, `VOCAB_SIZE` rows of
    /// `VOCAB_SIZE` unnormalized counts.
    pub transition_prior: Vec<Vec<f32>>,
    /// Weight of one transition observed in the context relative to one
    /// count of prior mass.
    pub context_weight: f32,
}

impl SamplerParams {
    /// Loads sampler parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        load_json(path)
    }

    /// A minimal built-in prior: stepwise motion dominates, holds are
    /// common, and every transition keeps a little mass so sampling never
    /// dead-ends.
    pub fn default_prior() -> Self {
        let mut prior = vec![vec![0.05f32; VOCAB_SIZE]; VOCAB_SIZE];
        for (code, row) in prior.iter_mut().enumerate() {
            if code <= 127 {
                // A sounding note usually holds, then moves by step.
                row[cadenza_core::HOLD as usize] = 8.0;
                for step in 1..=2usize {
                    if code >= step {
                        row[code - step] += 2.0;
                    }
                    if code + step <= 127 {
                        row[code + step] += 2.0;
                    }
                }
                row[code] += 1.0;
                row[REST as usize] += 0.5;
            } else {
                // Hold and rest resolve to mid-register onsets.
                for pitch in 55..=79usize {
                    row[pitch] += 1.0;
                }
                row[REST as usize] += 2.0;
            }
        }
        // Hold continues holding more often than it re-attacks.
        prior[cadenza_core::HOLD as usize][cadenza_core::HOLD as usize] = 6.0;

        Self {
            transition_prior: prior,
            context_weight: 4.0,
        }
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let text = fs::read_to_string(path).map_err(|err| ModelError::MissingParameters {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|err| ModelError::MissingParameters {
        path: path.display().to_string(),
        reason: format!("unreadable parameters: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_fast() {
        let err = CodecParams::load(Path::new("/nonexistent/codec.json")).unwrap_err();
        assert_eq!(err.code(), "MODEL_001");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_synthetic_shapes() {
        let params = CodecParams::synthetic(16, 24);
        assert_eq!(params.embeddings.len(), VOCAB_SIZE);
        assert!(params.embeddings.iter().all(|row| row.len() == 16));
        assert!(params.codebook.iter().all(|m| m.len() == 24));
    }

    #[test]
    fn test_default_prior_shapes() {
        let params = SamplerParams::default_prior();
        assert_eq!(params.transition_prior.len(), VOCAB_SIZE);
        assert!(params
            .transition_prior
            .iter()
            .all(|row| row.len() == VOCAB_SIZE));
    }

    #[test]
    fn test_round_trip_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampler.json");
        let params = SamplerParams::default_prior();
        std::fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();

        let loaded = SamplerParams::load(&path).unwrap();
        assert_eq!(loaded.context_weight, params.context_weight);
        assert_eq!(loaded.transition_prior, params.transition_prior);
    }

    #[test]
    fn test_corrupt_file_is_missing_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = CodecParams::load(&path).unwrap_err();
        assert_eq!(err.code(), "MODEL_001");
    }
}
