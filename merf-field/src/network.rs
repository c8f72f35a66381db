//! Hybrid grid + tri-plane radiance field
//!
//! Four spatial encoders (one 3D grid, three axis-aligned planes) each emit 8
//! feature channels. Their sum is decoded as:
//!
//! - channel 0: density logit, `sigma = trunc_exp(f0 - 1)`
//! - channels 1..4: diffuse color logits
//! - channels 4..8: specular feature, combined with the encoded view
//!   direction by a small MLP

use burn::module::Ignored;
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use merf_encoding::{FrequencyEncoder, FrequencyEncoderConfig, trunc_exp};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{GridBackend, NetworkConfig};
use crate::encoder::{DenseEncoderConfig, HashEncoder, HashEncoderConfig, SpatialEncoder};
use crate::error::NetworkError;
use crate::mlp::{Mlp, MlpConfig};
use crate::params::{ParamGroup, param_group};
use crate::proposal::{NetworkKind, ProposalNetwork};

/// Feature channels produced by every spatial encoder.
pub const FEATURE_DIM: usize = 8;

const DIFFUSE: std::ops::Range<usize> = 1..4;
const SPECULAR: std::ops::Range<usize> = 4..FEATURE_DIM;

/// How the final color is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    /// `clamp(diffuse + specular, 0, 1)`.
    #[default]
    Full,
    /// View-independent color only; the view MLP is skipped.
    Diffuse,
    /// View-dependent term only.
    Specular,
}

impl FromStr for Shading {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Shading::Full),
            "diffuse" => Ok(Shading::Diffuse),
            "specular" => Ok(Shading::Specular),
            other => Err(NetworkError::UnknownShading(other.to_string())),
        }
    }
}

impl fmt::Display for Shading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shading::Full => "full",
            Shading::Diffuse => "diffuse",
            Shading::Specular => "specular",
        };
        f.write_str(name)
    }
}

/// Result of [`NerfNetwork::forward`].
#[derive(Debug, Clone)]
pub struct FieldOutput<B: Backend> {
    /// Density, `[N]`.
    pub sigma: Tensor<B, 1>,
    /// RGB, `[N, 3]`.
    pub color: Tensor<B, 2>,
    /// View-dependent RGB, `[N, 3]`; absent for [`Shading::Diffuse`].
    pub specular: Option<Tensor<B, 2>>,
}

/// Result of [`NerfNetwork::density`].
#[derive(Debug, Clone)]
pub struct DensityOutput<B: Backend> {
    pub sigma: Tensor<B, 1>,
}

/// Raw, unsummed features of the four spatial encoders, each `[N, 8]`.
#[derive(Debug, Clone)]
pub struct SpatialFeatures<B: Backend> {
    pub grid: Tensor<B, 2>,
    pub plane_xy: Tensor<B, 2>,
    pub plane_yz: Tensor<B, 2>,
    pub plane_xz: Tensor<B, 2>,
}

impl<B: Backend> SpatialFeatures<B> {
    pub fn sum(self) -> Tensor<B, 2> {
        self.grid + self.plane_xy + self.plane_yz + self.plane_xz
    }
}

/// Scalar options captured from [`NetworkConfig`] at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOptions {
    pub bound: f32,
    pub total_variation: bool,
    pub tv_samples: usize,
}

/// MeRF-like radiance field.
#[derive(Module, Debug)]
pub struct NerfNetwork<B: Backend> {
    grid: SpatialEncoder<B>,
    plane_xy: HashEncoder<B>,
    plane_yz: HashEncoder<B>,
    plane_xz: HashEncoder<B>,
    view_encoder: FrequencyEncoder,
    view_mlp: Mlp<B>,
    /// One entry per proposal stage; empty for [`NetworkKind::Plain`].
    proposals: Vec<ProposalNetwork<B>>,
    kind: Ignored<NetworkKind>,
    options: Ignored<FieldOptions>,
}

impl<B: Backend> NerfNetwork<B> {
    #[tracing::instrument(skip_all, fields(bound = config.bound, cuda_ray = config.cuda_ray))]
    pub fn new(config: &NetworkConfig, device: &B::Device) -> Result<Self, NetworkError> {
        config.validate()?;
        let kind = config.kind();

        let grid = match config.grid_backend {
            GridBackend::Hash => SpatialEncoder::Hash(HashEncoderConfig::new().init(device)?),
            GridBackend::Dense => SpatialEncoder::Dense(
                DenseEncoderConfig::new()
                    .with_output_dim(FEATURE_DIM)
                    .with_resolution(config.dense_resolution)
                    .init(device),
            ),
        };

        let plane = HashEncoderConfig::new()
            .with_input_dim(2)
            .with_desired_resolution(2048)
            .with_output_dim(FEATURE_DIM);
        let plane_xy = plane.init(device)?;
        let plane_yz = plane.init(device)?;
        let plane_xz = plane.init(device)?;

        let view_config = FrequencyEncoderConfig::new().with_input_dim(3).with_multires(4);
        let view_mlp = MlpConfig::new(
            DIFFUSE.len() + SPECULAR.len() + view_config.output_dim(),
            3,
            16,
            3,
        )
        .init(device)?;

        let proposals = ProposalNetwork::stack(kind, device)?;

        let network = Self {
            grid,
            plane_xy,
            plane_yz,
            plane_xz,
            view_encoder: view_config.init(),
            view_mlp,
            proposals,
            kind: Ignored(kind),
            options: Ignored(FieldOptions {
                bound: config.bound,
                total_variation: config.total_variation,
                tv_samples: config.tv_samples,
            }),
        };

        info!(
            "Built radiance field: {:?} grid, {:?}, {} parameters",
            config.grid_backend,
            kind,
            network.num_params()
        );
        Ok(network)
    }

    pub fn kind(&self) -> NetworkKind {
        *self.kind
    }

    pub fn bound(&self) -> f32 {
        self.options.bound
    }

    /// Evaluate the four spatial encoders at `x` (`[N, 3]`).
    pub fn common_forward(&self, x: Tensor<B, 2>) -> SpatialFeatures<B> {
        let bound = self.options.bound;
        let [n, _] = x.dims();
        if n == 0 {
            let empty = Tensor::zeros([0, FEATURE_DIM], &x.device());
            return SpatialFeatures {
                grid: empty.clone(),
                plane_xy: empty.clone(),
                plane_yz: empty.clone(),
                plane_xz: empty,
            };
        }

        let axes = |a: usize, b: usize| {
            Tensor::cat(
                vec![
                    x.clone().slice([0..n, a..a + 1]),
                    x.clone().slice([0..n, b..b + 1]),
                ],
                1,
            )
        };

        SpatialFeatures {
            plane_xy: self.plane_xy.forward(axes(0, 1), bound),
            plane_yz: self.plane_yz.forward(axes(1, 2), bound),
            plane_xz: self.plane_xz.forward(axes(0, 2), bound),
            grid: self.grid.forward(x, bound),
        }
    }

    /// Density and color at points `x` seen from unit directions `d`.
    pub fn forward(&self, x: Tensor<B, 2>, d: Tensor<B, 2>, shading: Shading) -> FieldOutput<B> {
        if x.dims()[0] == 0 {
            let device = x.device();
            return FieldOutput {
                sigma: Tensor::zeros([0], &device),
                color: Tensor::zeros([0, 3], &device),
                specular: (shading != Shading::Diffuse).then(|| Tensor::zeros([0, 3], &device)),
            };
        }

        let f = self.common_forward(x).sum();
        let [n, _] = f.dims();

        let sigma = density_from_features(f.clone());
        let diffuse = sigmoid(f.clone().slice([0..n, DIFFUSE]));
        let f_specular = sigmoid(f.slice([0..n, SPECULAR]));

        if shading == Shading::Diffuse {
            return FieldOutput {
                sigma,
                color: diffuse,
                specular: None,
            };
        }

        let d = self.view_encoder.forward(d);
        let specular = sigmoid(
            self.view_mlp
                .forward(Tensor::cat(vec![diffuse.clone(), f_specular, d], 1)),
        );

        let color = match shading {
            Shading::Specular => specular.clone(),
            _ => (specular.clone() + diffuse).clamp(0.0, 1.0),
        };

        FieldOutput {
            sigma,
            color,
            specular: Some(specular),
        }
    }

    /// Density at `x`, from proposal stage `proposal` or the full field.
    ///
    /// `Some(i)` with `i` past the last stage falls through to the full
    /// field. Asking a [`NetworkKind::Plain`] network for any stage is an error.
    pub fn density(
        &self,
        x: Tensor<B, 2>,
        proposal: Option<usize>,
    ) -> Result<DensityOutput<B>, NetworkError> {
        let stage = match (*self.kind, proposal) {
            (NetworkKind::Plain, Some(_)) => return Err(NetworkError::ProposalNetworkUnavailable),
            (NetworkKind::WithProposal, Some(i)) => self.proposals.get(i),
            (_, None) => None,
        };

        if x.dims()[0] == 0 {
            return Ok(DensityOutput {
                sigma: Tensor::zeros([0], &x.device()),
            });
        }

        let sigma = match stage {
            Some(network) => network.density(x, self.options.bound),
            None => density_from_features(self.common_forward(x).sum()),
        };

        Ok(DensityOutput { sigma })
    }

    /// Add the grid total-variation penalty to `loss` when enabled.
    ///
    /// Disabled networks return `loss` untouched.
    pub fn apply_total_variation(&self, lambda: f32, loss: Tensor<B, 1>) -> Tensor<B, 1> {
        if !self.options.total_variation {
            return loss;
        }

        let samples = self.options.tv_samples;
        let mut loss = loss
            + self.plane_xy.total_variation(lambda, samples)
            + self.plane_yz.total_variation(lambda, samples)
            + self.plane_xz.total_variation(lambda, samples);
        if let Some(tv) = self.grid.total_variation(lambda, samples) {
            loss = loss + tv;
        }

        debug!("Applied total variation (lambda {})", lambda);
        loss
    }

    /// Parameter groups for the optimizer, all at learning rate `lr`.
    pub fn get_params(&self, lr: f64) -> Vec<ParamGroup> {
        let mut groups = vec![
            param_group("grid", &self.grid, lr),
            param_group("plane_xy", &self.plane_xy, lr),
            param_group("plane_yz", &self.plane_yz, lr),
            param_group("plane_xz", &self.plane_xz, lr),
            param_group("view_mlp", &self.view_mlp, lr),
        ];

        match *self.kind {
            NetworkKind::Plain => {}
            NetworkKind::WithProposal => {
                let encoders: Vec<_> = self.proposals.iter().map(|p| p.encoder().clone()).collect();
                let mlps: Vec<_> = self.proposals.iter().map(|p| p.mlp().clone()).collect();
                groups.push(param_group("prop_encoders", &encoders, lr));
                groups.push(param_group("prop_mlp", &mlps, lr));
            }
        }

        groups
    }
}

fn density_from_features<B: Backend>(f: Tensor<B, 2>) -> Tensor<B, 1> {
    let [n, _] = f.dims();
    trunc_exp(f.slice([0..n, 0..1]).squeeze::<1>(1).sub_scalar(1.0))
}
