//! Model dimensionality configuration.
//!
//! Carries the dimensionalities the pretrained models were built with.
//! Defaults match the reference configuration; loaded parameter artifacts
//! are validated against these values at load time.

use serde::{Deserialize, Serialize};

/// Dimensionalities and hyperparameters of the encoder, decoder, and
/// measure-level sequence model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Size of the note embeddings.
    pub note_embedding_dim: usize,
    /// Size of the metadata embeddings.
    pub metadata_embedding_dim: usize,
    /// Number of layers in the encoder RNN.
    pub num_encoder_layers: usize,
    /// Hidden size of the encoder RNN.
    pub encoder_hidden_size: usize,
    /// Dropout probability between encoder RNN layers.
    pub encoder_dropout: f64,
    /// Dimension of the latent space.
    pub latent_space_dim: usize,
    /// Number of layers in the decoder RNN.
    pub num_decoder_layers: usize,
    /// Hidden size of the decoder RNN.
    pub decoder_hidden_size: usize,
    /// Dropout probability between decoder RNN layers.
    pub decoder_dropout: f64,
    /// Number of layers in the measure-level RNN.
    pub num_latent_rnn_layers: usize,
    /// Hidden size of the measure-level RNN.
    pub latent_rnn_hidden_size: usize,
    /// Dropout probability between measure-level RNN layers.
    pub latent_rnn_dropout: f64,
    /// Batch size the models were trained with.
    pub batch_size: usize,
    /// Number of model variants to evaluate.
    pub num_models: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            note_embedding_dim: 10,
            metadata_embedding_dim: 2,
            num_encoder_layers: 2,
            encoder_hidden_size: 512,
            encoder_dropout: 0.5,
            latent_space_dim: 256,
            num_decoder_layers: 2,
            decoder_hidden_size: 512,
            decoder_dropout: 0.5,
            num_latent_rnn_layers: 2,
            latent_rnn_hidden_size: 512,
            latent_rnn_dropout: 0.5,
            batch_size: 16,
            num_models: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_configuration() {
        let config = ModelConfig::default();
        assert_eq!(config.note_embedding_dim, 10);
        assert_eq!(config.latent_space_dim, 256);
        assert_eq!(config.latent_rnn_hidden_size, 512);
        assert_eq!(config.batch_size, 16);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ModelConfig = serde_json::from_str(r#"{"latent_space_dim": 64}"#).unwrap();
        assert_eq!(config.latent_space_dim, 64);
        assert_eq!(config.encoder_hidden_size, 512);
    }
}
