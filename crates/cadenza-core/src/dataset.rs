//! Dataset provider contract.
//!
//! A dataset hands the driver an enumerable set of piece identifiers and
//! resolves each to a tick tensor. Corpus acquisition, caching, and score
//! parsing live behind this trait.

use thiserror::Error;

use crate::tensor::TickTensor;

/// Error type for dataset access.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be interpreted as a score.
    #[error("malformed score '{id}': {reason}")]
    Malformed {
        /// Piece identifier.
        id: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The requested piece identifier is not in the dataset.
    #[error("unknown piece: {0}")]
    UnknownPiece(String),
}

/// Supplies source pieces as tick tensors.
pub trait DatasetProvider {
    /// Identifiers of all pieces in the partition, in a stable order.
    fn piece_ids(&self) -> Vec<String>;

    /// Loads one piece and converts it to a tick tensor.
    fn load_tensor(&self, id: &str) -> Result<TickTensor, DatasetError>;
}
