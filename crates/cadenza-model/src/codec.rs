//! The embedding measure codec.
//!
//! Encoding pools a pretrained per-event embedding table over the measure's
//! ticks. Decoding reconstructs by nearest neighbor against a prototype
//! codebook whose latents are precomputed at load time. Reconstruction is
//! deliberately coarse; the codec's role during generation is the latent
//! recurrence, not high-fidelity decoding.

use std::path::Path;

use cadenza_core::{
    LatentCode, MeasureBlock, MeasureCodec, ModelError, ShapeError, REST, VOCAB_SIZE,
};

use crate::config::ModelConfig;
use crate::params::CodecParams;

/// A measure codec backed by a pretrained embedding table.
///
/// Constructible only via [`EmbeddingCodec::load`] or
/// [`EmbeddingCodec::from_params`].
#[derive(Debug)]
pub struct EmbeddingCodec {
    params: CodecParams,
    /// Latents of the codebook prototypes, parallel to `params.codebook`.
    prototype_latents: Vec<Vec<f32>>,
}

impl EmbeddingCodec {
    /// Loads and validates codec parameters from a JSON file.
    pub fn load(path: &Path, config: &ModelConfig) -> Result<Self, ModelError> {
        let params = CodecParams::load(path)?;
        Self::from_params(params, config)
    }

    /// Validates already-deserialized parameters against the configuration.
    pub fn from_params(params: CodecParams, config: &ModelConfig) -> Result<Self, ModelError> {
        if params.latent_dim != config.latent_space_dim {
            return Err(ModelError::ConfigMismatch(format!(
                "codec latent dim {} disagrees with configured latent space dim {}",
                params.latent_dim, config.latent_space_dim
            )));
        }
        if params.embeddings.len() != VOCAB_SIZE {
            return Err(ModelError::ConfigMismatch(format!(
                "embedding table has {} rows, vocabulary needs {}",
                params.embeddings.len(),
                VOCAB_SIZE
            )));
        }
        if let Some(row) = params
            .embeddings
            .iter()
            .find(|row| row.len() != params.latent_dim)
        {
            return Err(ModelError::ConfigMismatch(format!(
                "embedding row of dim {} in a latent space of dim {}",
                row.len(),
                params.latent_dim
            )));
        }
        if params.codebook.is_empty() {
            return Err(ModelError::ConfigMismatch(
                "codec codebook is empty".to_string(),
            ));
        }
        if let Some(proto) = params
            .codebook
            .iter()
            .find(|proto| proto.len() != params.ticks_per_measure)
        {
            return Err(ModelError::ConfigMismatch(format!(
                "codebook prototype spans {} ticks, measures span {}",
                proto.len(),
                params.ticks_per_measure
            )));
        }

        let prototype_latents = params
            .codebook
            .iter()
            .map(|proto| pool_embeddings(&params, proto))
            .collect();

        Ok(Self {
            params,
            prototype_latents,
        })
    }

    /// Ticks per measure the codec was trained with.
    pub fn ticks_per_measure(&self) -> usize {
        self.params.ticks_per_measure
    }
}

impl MeasureCodec for EmbeddingCodec {
    fn latent_dim(&self) -> usize {
        self.params.latent_dim
    }

    fn encode(&self, measure: &MeasureBlock) -> Result<LatentCode, ModelError> {
        if measure.width() != self.params.ticks_per_measure {
            return Err(ShapeError::BlockWidthMismatch {
                expected: self.params.ticks_per_measure,
                actual: measure.width(),
            }
            .into());
        }
        Ok(LatentCode(pool_embeddings(&self.params, measure.codes())))
    }

    fn decode(&self, latent: &LatentCode) -> Result<MeasureBlock, ModelError> {
        if latent.dim() != self.params.latent_dim {
            return Err(ModelError::ConfigMismatch(format!(
                "latent of dim {} in a latent space of dim {}",
                latent.dim(),
                self.params.latent_dim
            )));
        }

        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (index, proto_latent) in self.prototype_latents.iter().enumerate() {
            let dist = squared_distance(&latent.0, proto_latent);
            if dist < best_dist {
                best = index;
                best_dist = dist;
            }
        }

        Ok(MeasureBlock::new(self.params.codebook[best].clone()))
    }
}

/// Mean of the tick embeddings. Out-of-vocabulary codes pool as rest.
fn pool_embeddings(params: &CodecParams, codes: &[u16]) -> Vec<f32> {
    let mut pooled = vec![0.0f32; params.latent_dim];
    for &code in codes {
        let index = if (code as usize) < VOCAB_SIZE {
            code as usize
        } else {
            REST as usize
        };
        for (sum, value) in pooled.iter_mut().zip(&params.embeddings[index]) {
            *sum += value;
        }
    }
    let scale = 1.0 / codes.len().max(1) as f32;
    for value in &mut pooled {
        *value *= scale;
    }
    pooled
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_config(latent_dim: usize) -> ModelConfig {
        ModelConfig {
            latent_space_dim: latent_dim,
            ..ModelConfig::default()
        }
    }

    fn test_codec() -> EmbeddingCodec {
        EmbeddingCodec::from_params(CodecParams::synthetic(16, 24), &test_config(16)).unwrap()
    }

    #[test]
    fn test_latent_dim_disagreement_is_config_mismatch() {
        let err =
            EmbeddingCodec::from_params(CodecParams::synthetic(16, 24), &test_config(256))
                .unwrap_err();
        assert_eq!(err.code(), "MODEL_002");
    }

    #[test]
    fn test_truncated_embedding_table_rejected() {
        let mut params = CodecParams::synthetic(16, 24);
        params.embeddings.pop();
        let err = EmbeddingCodec::from_params(params, &test_config(16)).unwrap_err();
        assert_eq!(err.code(), "MODEL_002");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = test_codec();
        let measure = MeasureBlock::new(vec![60; 24]);
        let a = codec.encode(&measure).unwrap();
        let b = codec.encode(&measure).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(), 16);
    }

    #[test]
    fn test_encode_rejects_wrong_width() {
        let codec = test_codec();
        let err = codec.encode(&MeasureBlock::new(vec![60; 23])).unwrap_err();
        assert_eq!(err.code(), "SHAPE_003");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_decode_recovers_codebook_prototype() {
        let codec = test_codec();
        // A codebook prototype must decode back to itself exactly.
        let proto = MeasureBlock::new(codec.params.codebook[1].clone());
        let latent = codec.encode(&proto).unwrap();
        let decoded = codec.decode(&latent).unwrap();
        assert_eq!(decoded, proto);
    }

    #[test]
    fn test_decode_rejects_foreign_latent_dim() {
        let codec = test_codec();
        let err = codec.decode(&LatentCode(vec![0.0; 8])).unwrap_err();
        assert_eq!(err.code(), "MODEL_002");
    }
}
