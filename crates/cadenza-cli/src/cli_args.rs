//! CLI argument definitions for the Cadenza command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined
//! here, keeping `main.rs` focused on dispatch logic.

use clap::{Args, Parser, Subcommand};

/// Cadenza - Measure-Level Melody Infilling
#[derive(Parser)]
#[command(name = "cadenza")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Generate infilled variants of corpus pieces
    Infill {
        /// Directory containing the MIDI corpus
        #[arg(long)]
        dataset_dir: String,

        /// Path to the pretrained codec parameters (JSON)
        #[arg(long)]
        codec_params: String,

        /// Path to the pretrained sampler parameters (JSON)
        #[arg(long)]
        sampler_params: String,

        /// Output directory for generated MIDI files
        #[arg(long, default_value = "saved_midi")]
        out_dir: String,

        /// Restrict the run to one piece identifier
        #[arg(long, conflicts_with = "all")]
        piece: Option<String>,

        /// Process every qualifying piece
        #[arg(long)]
        all: bool,

        /// Independent samples to generate per piece
        #[arg(long, default_value_t = 15)]
        samples: usize,

        /// Base random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output machine-readable JSON report (no colored output)
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// List corpus pieces and whether they qualify for the window
    Pieces {
        /// Directory containing the MIDI corpus
        #[arg(long)]
        dataset_dir: String,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Context window geometry options.
#[derive(Args)]
pub(crate) struct WindowArgs {
    /// Number of past context measures
    #[arg(long, default_value_t = 6)]
    pub num_past: usize,

    /// Number of measures to generate
    #[arg(long, default_value_t = 4)]
    pub num_target: usize,

    /// Number of future context measures
    #[arg(long, default_value_t = 6)]
    pub num_future: usize,

    /// Beats per measure
    #[arg(long, default_value_t = 4)]
    pub beats_per_measure: usize,

    /// Tensor ticks per beat
    #[arg(long, default_value_t = 6)]
    pub subdivision: u16,
}

impl WindowArgs {
    pub fn to_spec(&self) -> cadenza_core::WindowSpec {
        cadenza_core::WindowSpec::new(
            self.beats_per_measure * self.subdivision as usize,
            self.num_past,
            self.num_target,
            self.num_future,
        )
    }
}

/// Model dimensionality options.
#[derive(Args)]
pub(crate) struct ModelArgs {
    /// Size of the note embeddings
    #[arg(long, default_value_t = 10)]
    pub note_embedding_dim: usize,

    /// Size of the metadata embeddings
    #[arg(long, default_value_t = 2)]
    pub metadata_embedding_dim: usize,

    /// Number of layers in the encoder RNN
    #[arg(long, default_value_t = 2)]
    pub num_encoder_layers: usize,

    /// Hidden size of the encoder RNN
    #[arg(long, default_value_t = 512)]
    pub encoder_hidden_size: usize,

    /// Dropout probability between encoder RNN layers
    #[arg(long, default_value_t = 0.5)]
    pub encoder_dropout: f64,

    /// Dimension of the latent space
    #[arg(long, default_value_t = 256)]
    pub latent_space_dim: usize,

    /// Number of layers in the decoder RNN
    #[arg(long, default_value_t = 2)]
    pub num_decoder_layers: usize,

    /// Hidden size of the decoder RNN
    #[arg(long, default_value_t = 512)]
    pub decoder_hidden_size: usize,

    /// Dropout probability between decoder RNN layers
    #[arg(long, default_value_t = 0.5)]
    pub decoder_dropout: f64,

    /// Number of layers in the measure-level RNN
    #[arg(long, default_value_t = 2)]
    pub num_latent_rnn_layers: usize,

    /// Hidden size of the measure-level RNN
    #[arg(long, default_value_t = 512)]
    pub latent_rnn_hidden_size: usize,

    /// Dropout probability between measure-level RNN layers
    #[arg(long, default_value_t = 0.5)]
    pub latent_rnn_dropout: f64,

    /// Batch size the models were trained with
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Number of model variants to evaluate
    #[arg(long, default_value_t = 4)]
    pub num_models: usize,
}

impl ModelArgs {
    pub fn to_config(&self) -> cadenza_model::ModelConfig {
        cadenza_model::ModelConfig {
            note_embedding_dim: self.note_embedding_dim,
            metadata_embedding_dim: self.metadata_embedding_dim,
            num_encoder_layers: self.num_encoder_layers,
            encoder_hidden_size: self.encoder_hidden_size,
            encoder_dropout: self.encoder_dropout,
            latent_space_dim: self.latent_space_dim,
            num_decoder_layers: self.num_decoder_layers,
            decoder_hidden_size: self.decoder_hidden_size,
            decoder_dropout: self.decoder_dropout,
            num_latent_rnn_layers: self.num_latent_rnn_layers,
            latent_rnn_hidden_size: self.latent_rnn_hidden_size,
            latent_rnn_dropout: self.latent_rnn_dropout,
            batch_size: self.batch_size,
            num_models: self.num_models,
        }
    }
}
