//! Host-side corner lookup shared by the grid encoders.
//!
//! Corner rows and interpolation weights carry no gradient, so they are
//! computed on the host. Only the final gather/blend over the embedding table
//! runs through tensor ops, which is what makes the tables trainable.

use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};

/// Largest lattice dimensionality supported by the lookups.
pub const MAX_DIM: usize = 7;

/// Interpolation between the corners of a lattice cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Multilinear weights.
    #[default]
    Linear,
    /// Weights shaped by `t²(3 - 2t)`.
    Smoothstep,
}

impl Interpolation {
    fn shape(self, t: f32) -> f32 {
        match self {
            Interpolation::Linear => t,
            Interpolation::Smoothstep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Gathered corner rows and weights for a batch of lattice lookups.
///
/// Entries are laid out point-major, then group (level), then corner.
pub(crate) struct Lookup {
    rows: Vec<i64>,
    weights: Vec<f32>,
}

impl Lookup {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            weights: Vec::with_capacity(capacity),
        }
    }

    /// Push every corner of the cell containing `pos`.
    ///
    /// `row` maps integer corner coordinates to a table row, or `None` when
    /// the corner lies outside the table; such corners contribute zero.
    pub fn push_cell<F>(&mut self, pos: &[f32], interpolation: Interpolation, mut row: F)
    where
        F: FnMut(&[i64]) -> Option<usize>,
    {
        let dim = pos.len();
        let mut base = [0i64; MAX_DIM];
        let mut frac = [0f32; MAX_DIM];
        for d in 0..dim {
            let floor = pos[d].floor();
            base[d] = floor as i64;
            frac[d] = interpolation.shape(pos[d] - floor);
        }

        let mut corner = [0i64; MAX_DIM];
        for mask in 0..(1usize << dim) {
            let mut weight = 1.0;
            for d in 0..dim {
                if mask & (1 << d) != 0 {
                    corner[d] = base[d] + 1;
                    weight *= frac[d];
                } else {
                    corner[d] = base[d];
                    weight *= 1.0 - frac[d];
                }
            }

            match row(&corner[..dim]) {
                Some(index) => {
                    self.rows.push(index as i64);
                    self.weights.push(weight);
                }
                None => {
                    self.rows.push(0);
                    self.weights.push(0.0);
                }
            }
        }
    }

    /// Push `corners` entries that contribute nothing.
    pub fn push_empty(&mut self, corners: usize) {
        self.rows.extend(std::iter::repeat_n(0, corners));
        self.weights.extend(std::iter::repeat_n(0.0, corners));
    }

    /// Blend rows of `table` (`[rows, features]`) into `[points, groups * features]`.
    pub fn blend<B: Backend>(
        self,
        table: Tensor<B, 2>,
        points: usize,
        groups: usize,
        corners: usize,
    ) -> Tensor<B, 2> {
        let device = table.device();
        let features = table.dims()[1];
        let count = self.rows.len();
        debug_assert_eq!(count, points * groups * corners);

        let rows = Tensor::<B, 1, Int>::from_data(
            TensorData::new(self.rows, [count]).convert::<B::IntElem>(),
            &device,
        );
        let weights = Tensor::<B, 2>::from_data(
            TensorData::new(self.weights, [count, 1]).convert::<B::FloatElem>(),
            &device,
        );

        table
            .select(0, rows)
            .mul(weights)
            .reshape([points, groups, corners, features])
            .sum_dim(2)
            .reshape([points, groups * features])
    }
}

/// Copy a `[N, D]` tensor to the host as row-major `f32` values.
pub(crate) fn host_coords<B: Backend>(x: Tensor<B, 2>) -> Vec<f32> {
    x.into_data().iter::<f32>().collect()
}
