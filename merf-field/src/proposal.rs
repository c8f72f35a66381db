//! Density-only proposal networks
//!
//! A proposal-sampling renderer queries these cheap networks to place samples
//! before evaluating the full field. They only exist when the renderer does
//! not march rays on the GPU.

use burn::prelude::*;
use merf_encoding::{GridType, HashGrid, HashGridConfig, trunc_exp};
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::mlp::{Mlp, MlpConfig};

/// Desired finest resolution of each proposal stage, coarse to fine.
pub const PROPOSAL_RESOLUTIONS: [u32; 2] = [128, 256];

/// Whether the network carries proposal networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkKind {
    /// GPU ray marching: the full field only.
    Plain,
    /// Proposal sampling: one density network per stage in
    /// [`PROPOSAL_RESOLUTIONS`].
    WithProposal,
}

impl NetworkKind {
    pub fn from_cuda_ray(cuda_ray: bool) -> Self {
        if cuda_ray {
            NetworkKind::Plain
        } else {
            NetworkKind::WithProposal
        }
    }

    /// Number of proposal stages of this kind.
    pub fn stages(self) -> usize {
        match self {
            NetworkKind::Plain => 0,
            NetworkKind::WithProposal => PROPOSAL_RESOLUTIONS.len(),
        }
    }
}

/// Hash grid + MLP predicting density only.
#[derive(Module, Debug)]
pub struct ProposalNetwork<B: Backend> {
    encoder: HashGrid<B>,
    mlp: Mlp<B>,
}

impl<B: Backend> ProposalNetwork<B> {
    pub fn new(desired_resolution: u32, device: &B::Device) -> Result<Self, NetworkError> {
        let grid_config = HashGridConfig::new(3)
            .with_level_dim(2)
            .with_num_levels(5)
            .with_log2_hashmap_size(17)
            .with_desired_resolution(Some(desired_resolution))
            .with_grid_type(GridType::Hash);

        let encoder = grid_config.init(device)?;
        let mlp = MlpConfig::new(grid_config.output_dim(), 1, 16, 2)
            .with_bias(false)
            .init(device)?;

        Ok(Self { encoder, mlp })
    }

    /// Build every stage of `kind`.
    pub fn stack(kind: NetworkKind, device: &B::Device) -> Result<Vec<Self>, NetworkError> {
        PROPOSAL_RESOLUTIONS[..kind.stages()]
            .iter()
            .map(|&resolution| Self::new(resolution, device))
            .collect()
    }

    pub fn encoder(&self) -> &HashGrid<B> {
        &self.encoder
    }

    pub fn mlp(&self) -> &Mlp<B> {
        &self.mlp
    }

    /// Density `[N]` at points `[N, 3]`.
    pub fn density(&self, x: Tensor<B, 2>, bound: f32) -> Tensor<B, 1> {
        if x.dims()[0] == 0 {
            return Tensor::zeros([0], &x.device());
        }
        let logit = self.mlp.forward(self.encoder.forward(x, bound));
        trunc_exp(logit.squeeze::<1>(1).sub_scalar(1.0))
    }
}
