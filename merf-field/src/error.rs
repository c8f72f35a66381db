//! Error types for building and querying the radiance field.

use merf_encoding::EncodingError;
use thiserror::Error;

/// Errors that can occur in the radiance field.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Proposal networks are not available when GPU ray marching is enabled")]
    ProposalNetworkUnavailable,

    #[error("MLP needs at least one layer, got {0}")]
    InvalidLayerCount(usize),

    #[error("Unknown shading mode: {0}")]
    UnknownShading(String),

    #[error("Scene bound must be positive and finite, got {0}")]
    InvalidBound(f32),

    #[error("Encoder error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
