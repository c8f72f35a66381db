//! MeRF Encoding Crate
//!
//! Positional encoders and activations used by the radiance field. Everything
//! here is generic over a burn [`Backend`](burn::tensor::backend::Backend), so
//! the same code runs on the CPU test backend and under autodiff.
//!
//! ## Modules
//!
//! - [`hashgrid`]: multiresolution hash / tiled grid encoder
//! - [`frequency`]: sinusoidal frequency encoder for view directions
//! - [`sampling`]: trilinear sampling of dense voxel volumes
//! - [`activation`]: truncated exponential

pub mod activation;
pub mod error;
pub mod frequency;
pub mod hashgrid;
pub mod sampling;

mod lattice;

pub use activation::trunc_exp;
pub use error::EncodingError;
pub use frequency::{FrequencyEncoder, FrequencyEncoderConfig};
pub use hashgrid::{GridType, HashGrid, HashGridConfig};
pub use lattice::Interpolation;
pub use sampling::sample_trilinear;
