//! Shape error taxonomy for tensor segmentation and context splitting.

use thiserror::Error;

/// A tensor or measure sequence had the wrong shape for the requested
/// operation.
///
/// Shape errors are fatal to the single operation that raised them. The
/// generation driver catches them at per-piece / per-sample granularity and
/// skips, rather than aborting the whole run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Tensor length is not divisible by the measure width.
    #[error("tensor length {length} is not divisible by measure width {ticks_per_measure}")]
    NotMeasureAligned {
        /// Total tick count of the tensor.
        length: usize,
        /// Configured ticks per measure.
        ticks_per_measure: usize,
    },

    /// A measure sequence did not contain the expected number of measures.
    #[error("expected {expected} measures, got {actual}")]
    MeasureCountMismatch {
        /// Measures required by the window.
        expected: usize,
        /// Measures actually supplied.
        actual: usize,
    },

    /// A measure block did not span the expected number of ticks.
    #[error("measure block spans {actual} ticks, expected {expected}")]
    BlockWidthMismatch {
        /// Configured ticks per measure.
        expected: usize,
        /// Width of the offending block.
        actual: usize,
    },
}

impl ShapeError {
    /// Returns a stable error code for reporting (e.g., "SHAPE_001").
    pub fn code(&self) -> &'static str {
        match self {
            ShapeError::NotMeasureAligned { .. } => "SHAPE_001",
            ShapeError::MeasureCountMismatch { .. } => "SHAPE_002",
            ShapeError::BlockWidthMismatch { .. } => "SHAPE_003",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        let err = ShapeError::NotMeasureAligned {
            length: 25,
            ticks_per_measure: 24,
        };
        assert_eq!(err.code(), "SHAPE_001");

        let err = ShapeError::MeasureCountMismatch {
            expected: 16,
            actual: 15,
        };
        assert_eq!(err.code(), "SHAPE_002");
    }

    #[test]
    fn test_display_names_both_sides() {
        let err = ShapeError::NotMeasureAligned {
            length: 25,
            ticks_per_measure: 24,
        };
        let msg = err.to_string();
        assert!(msg.contains("25"));
        assert!(msg.contains("24"));
    }
}
