//! Grouped optimizer steps on a synthetic scene
//!
//! Fits the radiance field to a solid sphere of constant color, training the
//! proposal networks on the same density target. Every step consumes the
//! parameter groups of `get_params` through `step_param_groups`.
//!
//! Usage:
//!   cargo run --example train_step -- [steps]

use burn::backend::{Autodiff, NdArray};
use burn::optim::AdamConfig;
use burn::prelude::*;
use burn::tensor::Distribution;
use std::error::Error;
use tracing::info;

use merf_field::{NerfNetwork, NetworkConfig, NetworkKind, Shading, step_param_groups};

type Backend = Autodiff<NdArray>;

const LEARNING_RATE: f64 = 1e-2;
const TV_LAMBDA: f32 = 1e-6;
const BATCH: usize = 1024;
const RADIUS: f32 = 0.5;
const DENSITY: f32 = 10.0;

fn mse(pred: Tensor<Backend, 1>, target: Tensor<Backend, 1>) -> Tensor<Backend, 1> {
    (pred - target).powf_scalar(2.0).mean()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let steps: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 20,
    };

    let device = Default::default();
    let config = NetworkConfig::new()
        .with_total_variation(true)
        .with_tv_samples(1024);
    let mut network = NerfNetwork::<Backend>::new(&config, &device)?;
    let groups = network.get_params(LEARNING_RATE);
    info!("Training {} parameter groups for {} steps", groups.len(), steps);

    let mut optimizer = AdamConfig::new().with_epsilon(1e-15).init();
    let color = Tensor::<Backend, 2>::from_floats([[0.8, 0.3, 0.1]], &device);

    for step in 0..steps {
        let x = Tensor::<Backend, 2>::random([BATCH, 3], Distribution::Uniform(-1.0, 1.0), &device);
        let d = Tensor::<Backend, 2>::random([BATCH, 3], Distribution::Normal(0.0, 1.0), &device);
        let d = d.clone().div(d.powf_scalar(2.0).sum_dim(1).sqrt());

        let inside = x
            .clone()
            .powf_scalar(2.0)
            .sum_dim(1)
            .squeeze::<1>(1)
            .lower_equal_elem(RADIUS * RADIUS)
            .float();
        let target_sigma = inside.mul_scalar(DENSITY);

        let out = network.forward(x.clone(), d, Shading::Full);
        let mut loss = mse(out.sigma, target_sigma.clone())
            + (out.color - color.clone()).powf_scalar(2.0).mean();

        if network.kind() == NetworkKind::WithProposal {
            for stage in 0..NetworkKind::WithProposal.stages() {
                let proposal = network.density(x.clone(), Some(stage))?;
                loss = loss + mse(proposal.sigma, target_sigma.clone());
            }
        }

        let loss = network.apply_total_variation(TV_LAMBDA, loss);
        let value: f32 = loss.clone().inner().into_scalar();
        info!("step {:>3}: loss {:.6}", step, value);

        let grads = loss.backward();
        network = step_param_groups(&mut optimizer, network, &groups, grads);
    }

    info!("Training demo completed");
    Ok(())
}
