//! Error types for encoder construction.

use thiserror::Error;

/// Errors that can occur while building an encoder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Unsupported input dimension: {0} (expected 1..=7)")]
    InputDim(usize),

    #[error("Grid encoder needs at least one level")]
    NoLevels,

    #[error("Grid encoder needs a non-zero feature width per level")]
    NoFeatures,

    #[error("Invalid resolution: base {base}, desired {desired}")]
    Resolution { base: u32, desired: u32 },

    #[error("Hash table size 2^{0} exceeds 2^32 rows")]
    HashmapSize(u32),
}
