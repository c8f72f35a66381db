//! Multi-layer perceptron

use burn::config::Config;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::error::NetworkError;

/// Configuration of an [`Mlp`].
#[derive(Config, Debug)]
pub struct MlpConfig {
    pub dim_in: usize,
    pub dim_out: usize,
    pub dim_hidden: usize,
    pub num_layers: usize,
    #[config(default = true)]
    pub bias: bool,
}

impl MlpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Mlp<B>, NetworkError> {
        if self.num_layers == 0 {
            return Err(NetworkError::InvalidLayerCount(self.num_layers));
        }

        let last = self.num_layers - 1;
        let layers = (0..self.num_layers)
            .map(|l| {
                let dim_in = if l == 0 { self.dim_in } else { self.dim_hidden };
                let dim_out = if l == last { self.dim_out } else { self.dim_hidden };
                LinearConfig::new(dim_in, dim_out)
                    .with_bias(self.bias)
                    .init(device)
            })
            .collect();

        Ok(Mlp {
            layers,
            activation: Relu::new(),
        })
    }
}

/// Linear layers with ReLU between all but the last.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Linear<B>>,
    activation: Relu,
}

impl<B: Backend> Mlp<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len() - 1;
        let mut x = x;
        for (l, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if l != last {
                x = self.activation.forward(x);
            }
        }
        x
    }
}
