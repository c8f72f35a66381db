//! MeRF Field Crate
//!
//! This crate provides the neural scene representation used by the volumetric
//! renderer: a hybrid of one 3D hash grid and three axis-aligned 2D hash grids
//! (tri-plane), decoded into density, diffuse color and a view-dependent
//! specular term.
//!
//! ## Modules
//!
//! - [`network`]: the radiance field and its forward / density queries
//! - [`encoder`]: spatial encoders (hash grid + MLP, dense voxel grid)
//! - [`proposal`]: density-only proposal networks for coarse sampling
//! - [`mlp`]: plain ReLU multi-layer perceptron
//! - [`params`]: optimizer parameter groups
//! - [`batch`]: conversions between `glam` vectors and tensors
//! - [`config`]: network configuration

pub mod batch;
pub mod config;
pub mod encoder;
pub mod error;
pub mod mlp;
pub mod network;
pub mod params;
pub mod proposal;

pub use config::{GridBackend, NetworkConfig};
pub use error::NetworkError;
pub use network::{DensityOutput, FieldOutput, NerfNetwork, Shading, SpatialFeatures};
pub use params::{ParamGroup, step_param_groups};
pub use proposal::NetworkKind;
