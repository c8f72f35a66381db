//! Multiresolution hash grid encoder
//!
//! Every level is a lattice whose vertices index a slice of one shared
//! embedding table. Coarse levels fit densely into their slice; finer levels
//! are either hashed (`GridType::Hash`) or wrapped modulo the slice size
//! (`GridType::Tiled`).

use burn::config::Config;
use burn::module::{Ignored, Param};
use burn::prelude::*;
use burn::tensor::{Distribution, TensorData};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EncodingError;
use crate::lattice::{Interpolation, Lookup, MAX_DIM, host_coords};

/// Spatial hash primes, one per input dimension.
const PRIMES: [u32; MAX_DIM] = [
    1, 2654435761, 805459861, 3674653429, 2097192037, 1434869437, 2165219737,
];

/// Largest table slice, as a power of two. Hashes are 32 bits wide.
pub const MAX_LOG2_HASHMAP_SIZE: u32 = 32;

/// Bound of the uniform initialisation of the embedding table.
const INIT_RANGE: f64 = 1e-4;

/// How lattice vertices of a level map onto its slice of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridType {
    /// Dense indexing while the level fits, spatial hashing beyond that.
    #[default]
    Hash,
    /// Dense indexing wrapped modulo the slice size.
    Tiled,
}

/// Configuration of a [`HashGrid`].
#[derive(Config, Debug)]
pub struct HashGridConfig {
    /// Dimensionality of the encoded coordinates.
    pub input_dim: usize,
    /// Features stored per lattice vertex.
    #[config(default = 2)]
    pub level_dim: usize,
    #[config(default = 16)]
    pub num_levels: usize,
    /// Upper bound on the size of a level's slice, as a power of two
    /// (at most [`MAX_LOG2_HASHMAP_SIZE`]).
    #[config(default = 19)]
    pub log2_hashmap_size: u32,
    #[config(default = 16)]
    pub base_resolution: u32,
    /// Resolution of the finest level. Levels double when unset.
    pub desired_resolution: Option<u32>,
    #[config(default = "GridType::Hash")]
    pub grid_type: GridType,
    #[config(default = "Interpolation::Linear")]
    pub interpolation: Interpolation,
    #[config(default = false)]
    pub align_corners: bool,
}

/// A single resolution level of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLevel {
    /// First row of this level in the embedding table.
    pub offset: usize,
    /// Number of rows owned by this level.
    pub size: usize,
    /// Lattice vertices along each axis.
    pub side: u64,
    /// Scale applied to unit coordinates.
    pub scale: f32,
}

/// Static layout of the levels, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub input_dim: usize,
    pub level_dim: usize,
    pub levels: Vec<GridLevel>,
    pub grid_type: GridType,
    pub interpolation: Interpolation,
    pub align_corners: bool,
}

impl GridLayout {
    fn corners(&self) -> usize {
        1 << self.input_dim
    }

    fn rows(&self) -> usize {
        self.levels.last().map_or(0, |level| level.offset + level.size)
    }

    /// Table row for integer vertex coordinates on `level`.
    fn row(&self, level: &GridLevel, vertex: &[i64]) -> usize {
        let mut stride = 1u64;
        let mut index = 0u64;
        for &coord in vertex {
            index = index.wrapping_add((coord as u64).wrapping_mul(stride));
            stride = stride.saturating_mul(level.side);
        }

        if self.grid_type == GridType::Hash && stride > level.size as u64 {
            index = spatial_hash(vertex) as u64;
        }

        level.offset + (index % level.size as u64) as usize
    }
}

fn spatial_hash(vertex: &[i64]) -> u32 {
    vertex
        .iter()
        .zip(PRIMES.iter())
        .fold(0u32, |hash, (&coord, &prime)| hash ^ (coord as u32).wrapping_mul(prime))
}

impl HashGridConfig {
    /// Per-level growth factor of the lattice resolution.
    pub fn per_level_scale(&self) -> f32 {
        match self.desired_resolution {
            Some(desired) if self.num_levels > 1 => {
                let ratio = desired as f32 / self.base_resolution as f32;
                (ratio.log2() / (self.num_levels - 1) as f32).exp2()
            }
            Some(_) => 1.0,
            None => 2.0,
        }
    }

    /// Width of the encoded output.
    pub fn output_dim(&self) -> usize {
        self.num_levels * self.level_dim
    }

    /// Compute the level layout without allocating any parameters.
    pub fn layout(&self) -> Result<GridLayout, EncodingError> {
        if self.input_dim == 0 || self.input_dim > MAX_DIM {
            return Err(EncodingError::InputDim(self.input_dim));
        }
        if self.num_levels == 0 {
            return Err(EncodingError::NoLevels);
        }
        if self.level_dim == 0 {
            return Err(EncodingError::NoFeatures);
        }
        let desired = self.desired_resolution.unwrap_or(self.base_resolution);
        if self.base_resolution == 0 || desired == 0 {
            return Err(EncodingError::Resolution {
                base: self.base_resolution,
                desired,
            });
        }

        if self.log2_hashmap_size > MAX_LOG2_HASHMAP_SIZE {
            return Err(EncodingError::HashmapSize(self.log2_hashmap_size));
        }

        let max_params = 1u64 << self.log2_hashmap_size;
        let growth = self.per_level_scale();
        let log2_growth = growth.log2();

        let mut levels = Vec::with_capacity(self.num_levels);
        let mut offset = 0;
        for l in 0..self.num_levels {
            let resolution =
                (self.base_resolution as f32 * growth.powi(l as i32)).ceil() as u64;
            let side = if self.align_corners {
                resolution
            } else {
                resolution + 1
            };
            let dense = side.saturating_pow(self.input_dim as u32);
            let size = (dense.min(max_params) as usize).div_ceil(8) * 8;
            let scale = (l as f32 * log2_growth).exp2() * self.base_resolution as f32 - 1.0;

            levels.push(GridLevel {
                offset,
                size,
                side,
                scale,
            });
            offset += size;
        }

        Ok(GridLayout {
            input_dim: self.input_dim,
            level_dim: self.level_dim,
            levels,
            grid_type: self.grid_type,
            interpolation: self.interpolation,
            align_corners: self.align_corners,
        })
    }

    /// Build the encoder with a freshly initialised embedding table.
    #[tracing::instrument(skip_all, fields(input_dim = self.input_dim, levels = self.num_levels))]
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<HashGrid<B>, EncodingError> {
        let layout = self.layout()?;
        let rows = layout.rows();

        debug!(
            "Hash grid: {} rows x {} features, {:?}, finest side {}",
            rows,
            self.level_dim,
            self.grid_type,
            layout.levels.last().map_or(0, |level| level.side)
        );

        let embeddings = Tensor::<B, 2>::random(
            [rows, self.level_dim],
            Distribution::Uniform(-INIT_RANGE, INIT_RANGE),
            device,
        );

        Ok(HashGrid {
            embeddings: Param::from_tensor(embeddings),
            layout: Ignored(layout),
        })
    }
}

/// Multiresolution grid encoder over coordinates in `[-bound, bound]`.
#[derive(Module, Debug)]
pub struct HashGrid<B: Backend> {
    embeddings: Param<Tensor<B, 2>>,
    layout: Ignored<GridLayout>,
}

impl<B: Backend> HashGrid<B> {
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn input_dim(&self) -> usize {
        self.layout.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.layout.levels.len() * self.layout.level_dim
    }

    /// The embedding table, `[rows, level_dim]`.
    pub fn embeddings(&self) -> Tensor<B, 2> {
        self.embeddings.val()
    }

    /// Encode `x` (`[N, input_dim]`) into `[N, num_levels * level_dim]`.
    ///
    /// Points with any coordinate outside `[-bound, bound]` encode to zero.
    pub fn forward(&self, x: Tensor<B, 2>, bound: f32) -> Tensor<B, 2> {
        let [points, dim] = x.dims();
        assert_eq!(dim, self.layout.input_dim, "hash grid input dimension");
        if points == 0 {
            return Tensor::zeros([0, self.output_dim()], &x.device());
        }

        let layout = &*self.layout;
        let corners = layout.corners();
        let shift = if layout.align_corners { 0.0 } else { 0.5 };
        let coords = host_coords(x);

        let mut lookup = Lookup::with_capacity(points * layout.levels.len() * corners);
        let mut unit = [0f32; MAX_DIM];
        let mut pos = [0f32; MAX_DIM];
        for point in coords.chunks_exact(dim) {
            for d in 0..dim {
                unit[d] = (point[d] + bound) / (2.0 * bound);
            }
            let inside = unit[..dim].iter().all(|u| (0.0..=1.0).contains(u));

            for level in &layout.levels {
                if !inside {
                    lookup.push_empty(corners);
                    continue;
                }
                for d in 0..dim {
                    pos[d] = unit[d] * level.scale + shift;
                }
                lookup.push_cell(&pos[..dim], layout.interpolation, |vertex| {
                    Some(layout.row(level, vertex))
                });
            }
        }

        lookup.blend(self.embeddings.val(), points, layout.levels.len(), corners)
    }

    /// Total-variation penalty over `samples` random lattice vertices per level.
    ///
    /// Returns `lambda / 2 * mean(|e(v + axis) - e(v)|²)`, a `[1]` tensor whose
    /// gradient lands on the embedding table.
    pub fn total_variation(&self, lambda: f32, samples: usize) -> Tensor<B, 1> {
        let layout = &*self.layout;
        let dim = layout.input_dim;
        let device = self.embeddings.val().device();

        let unit = host_coords(Tensor::<B, 2>::random(
            [samples.max(1), dim],
            Distribution::Uniform(0.0, 1.0),
            &device,
        ));

        let mut here = Vec::new();
        let mut next = Vec::new();
        let mut vertex = [0i64; MAX_DIM];
        for level in &layout.levels {
            let last = level.side.saturating_sub(2) as f32;
            for point in unit.chunks_exact(dim) {
                for d in 0..dim {
                    vertex[d] = (point[d] * last).floor() as i64;
                }
                let base = layout.row(level, &vertex[..dim]) as i64;
                for d in 0..dim {
                    vertex[d] += 1;
                    here.push(base);
                    next.push(layout.row(level, &vertex[..dim]) as i64);
                    vertex[d] -= 1;
                }
            }
        }

        let count = here.len();
        let index = |rows: Vec<i64>| {
            Tensor::<B, 1, Int>::from_data(
                TensorData::new(rows, [count]).convert::<B::IntElem>(),
                &device,
            )
        };

        let table = self.embeddings.val();
        let diff = table.clone().select(0, index(next)) - table.select(0, index(here));

        diff.powf_scalar(2.0).mean().mul_scalar(lambda * 0.5)
    }
}
