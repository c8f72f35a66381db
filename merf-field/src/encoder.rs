//! Spatial encoders of the radiance field
//!
//! [`HashEncoder`] is the production path: a tiled multiresolution grid whose
//! features are projected by a small MLP. [`DenseEncoder`] samples a plain
//! voxel grid and shares the same call signature, so the 3D grid of the
//! network can be swapped through [`SpatialEncoder`].

use burn::config::Config;
use burn::module::Param;
use burn::prelude::*;
use merf_encoding::{GridType, HashGrid, HashGridConfig, Interpolation, sample_trilinear};
use tracing::debug;

use crate::error::NetworkError;
use crate::mlp::{Mlp, MlpConfig};

/// Configuration of a [`HashEncoder`].
#[derive(Config, Debug)]
pub struct HashEncoderConfig {
    #[config(default = 3)]
    pub input_dim: usize,
    #[config(default = 2)]
    pub level_dim: usize,
    #[config(default = 16)]
    pub num_levels: usize,
    #[config(default = 19)]
    pub log2_hashmap_size: u32,
    #[config(default = 512)]
    pub desired_resolution: u32,
    #[config(default = 8)]
    pub output_dim: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = 64)]
    pub hidden_dim: usize,
}

impl HashEncoderConfig {
    pub fn grid(&self) -> HashGridConfig {
        HashGridConfig::new(self.input_dim)
            .with_level_dim(self.level_dim)
            .with_num_levels(self.num_levels)
            .with_log2_hashmap_size(self.log2_hashmap_size)
            .with_desired_resolution(Some(self.desired_resolution))
            .with_grid_type(GridType::Tiled)
            .with_interpolation(Interpolation::Linear)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<HashEncoder<B>, NetworkError> {
        let grid_config = self.grid();
        let grid = grid_config.init(device)?;
        let mlp = MlpConfig::new(
            grid_config.output_dim(),
            self.output_dim,
            self.hidden_dim,
            self.num_layers,
        )
        .with_bias(false)
        .init(device)?;

        Ok(HashEncoder { grid, mlp })
    }
}

/// Hash grid encoding followed by an MLP projection.
#[derive(Module, Debug)]
pub struct HashEncoder<B: Backend> {
    grid: HashGrid<B>,
    mlp: Mlp<B>,
}

impl<B: Backend> HashEncoder<B> {
    pub fn forward(&self, x: Tensor<B, 2>, bound: f32) -> Tensor<B, 2> {
        self.mlp.forward(self.grid.forward(x, bound))
    }

    /// Total-variation penalty of the underlying grid.
    pub fn total_variation(&self, lambda: f32, samples: usize) -> Tensor<B, 1> {
        self.grid.total_variation(lambda, samples)
    }

    pub fn grid(&self) -> &HashGrid<B> {
        &self.grid
    }
}

/// Configuration of a [`DenseEncoder`].
#[derive(Config, Debug)]
pub struct DenseEncoderConfig {
    #[config(default = 8)]
    pub output_dim: usize,
    #[config(default = 64)]
    pub resolution: usize,
}

impl DenseEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseEncoder<B> {
        let r = self.resolution;
        debug!("Dense grid: {} channels at {}^3", self.output_dim, r);

        DenseEncoder {
            grid: Param::from_tensor(Tensor::zeros([1, self.output_dim, r, r, r], device)),
        }
    }
}

/// Dense voxel grid, `[1, output_dim, R, R, R]`, sampled trilinearly.
#[derive(Module, Debug)]
pub struct DenseEncoder<B: Backend> {
    grid: Param<Tensor<B, 5>>,
}

impl<B: Backend> DenseEncoder<B> {
    pub fn output_dim(&self) -> usize {
        self.grid.val().dims()[1]
    }

    pub fn forward(&self, x: Tensor<B, 2>, bound: f32) -> Tensor<B, 2> {
        sample_trilinear(self.grid.val(), x.div_scalar(bound))
    }
}

/// The 3D encoder of the network.
#[derive(Module, Debug)]
pub enum SpatialEncoder<B: Backend> {
    Hash(HashEncoder<B>),
    Dense(DenseEncoder<B>),
}

impl<B: Backend> SpatialEncoder<B> {
    pub fn forward(&self, x: Tensor<B, 2>, bound: f32) -> Tensor<B, 2> {
        match self {
            SpatialEncoder::Hash(encoder) => encoder.forward(x, bound),
            SpatialEncoder::Dense(encoder) => encoder.forward(x, bound),
        }
    }

    /// Dense grids carry no total-variation term.
    pub fn total_variation(&self, lambda: f32, samples: usize) -> Option<Tensor<B, 1>> {
        match self {
            SpatialEncoder::Hash(encoder) => Some(encoder.total_variation(lambda, samples)),
            SpatialEncoder::Dense(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn small_hash(input_dim: usize) -> HashEncoderConfig {
        HashEncoderConfig::new()
            .with_input_dim(input_dim)
            .with_num_levels(4)
            .with_log2_hashmap_size(12)
            .with_desired_resolution(64)
    }

    #[test]
    fn test_hash_encoder_shapes() {
        let device = Default::default();
        let plane = small_hash(2).init::<TestBackend>(&device).unwrap();

        let x = Tensor::<TestBackend, 2>::random([7, 2], Distribution::Uniform(-1.0, 1.0), &device);
        assert_eq!(plane.forward(x, 1.0).dims(), [7, 8]);
        assert_eq!(plane.grid().output_dim(), 8);
    }

    #[test]
    fn test_hash_encoder_uses_tiled_grid() {
        let config = small_hash(3);
        assert_eq!(config.grid().grid_type, GridType::Tiled);
        assert_eq!(config.grid().desired_resolution, Some(64));
    }

    #[test]
    fn test_dense_encoder_starts_at_zero() {
        let device = Default::default();
        let dense = DenseEncoderConfig::new()
            .with_resolution(8)
            .init::<TestBackend>(&device);
        assert_eq!(dense.output_dim(), 8);

        let x = Tensor::<TestBackend, 2>::random([5, 3], Distribution::Uniform(-2.0, 2.0), &device);
        let out = dense.forward(x, 2.0);
        assert_eq!(out.dims(), [5, 8]);

        let values: Vec<f32> = out.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_spatial_encoder_dispatch() {
        let device = Default::default();
        let hash = SpatialEncoder::Hash(small_hash(3).init::<TestBackend>(&device).unwrap());
        let dense = SpatialEncoder::Dense(
            DenseEncoderConfig::new()
                .with_resolution(4)
                .init::<TestBackend>(&device),
        );

        let x = Tensor::<TestBackend, 2>::random([3, 3], Distribution::Uniform(-1.0, 1.0), &device);
        assert_eq!(hash.forward(x.clone(), 1.0).dims(), [3, 8]);
        assert_eq!(dense.forward(x, 1.0).dims(), [3, 8]);

        assert!(hash.total_variation(1.0, 16).is_some());
        assert!(dense.total_variation(1.0, 16).is_none());
    }
}
