//! Sinusoidal frequency encoding

use burn::config::Config;
use burn::prelude::*;

/// Configuration of a [`FrequencyEncoder`].
#[derive(Config, Debug)]
pub struct FrequencyEncoderConfig {
    #[config(default = 3)]
    pub input_dim: usize,
    /// Number of octaves, `2^0 .. 2^(multires - 1)`.
    #[config(default = 4)]
    pub multires: usize,
}

impl FrequencyEncoderConfig {
    pub fn output_dim(&self) -> usize {
        self.input_dim * (1 + 2 * self.multires)
    }

    pub fn init(&self) -> FrequencyEncoder {
        FrequencyEncoder {
            input_dim: self.input_dim,
            multires: self.multires,
        }
    }
}

/// Encodes `x` as `[x, sin(2^0 x), cos(2^0 x), ..., sin(2^(m-1) x), cos(2^(m-1) x)]`.
#[derive(Module, Clone, Debug)]
pub struct FrequencyEncoder {
    input_dim: usize,
    multires: usize,
}

impl FrequencyEncoder {
    pub fn output_dim(&self) -> usize {
        self.input_dim * (1 + 2 * self.multires)
    }

    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut parts = Vec::with_capacity(1 + 2 * self.multires);
        parts.push(x.clone());
        for octave in 0..self.multires {
            let scaled = x.clone().mul_scalar((octave as f32).exp2());
            parts.push(scaled.clone().sin());
            parts.push(scaled.cos());
        }
        Tensor::cat(parts, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_output_dim() {
        let config = FrequencyEncoderConfig::new();
        assert_eq!(config.output_dim(), 27);
        assert_eq!(config.init().output_dim(), 27);
        assert_eq!(FrequencyEncoderConfig::new().with_multires(0).output_dim(), 3);
    }

    #[test]
    fn test_encoding_of_origin() {
        let device = Default::default();
        let encoder = FrequencyEncoderConfig::new().with_multires(2).init();
        let x = Tensor::<NdArray, 2>::zeros([1, 3], &device);

        let out = encoder.forward(x);
        assert_eq!(out.dims(), [1, 15]);

        let values: Vec<f32> = out.into_data().iter::<f32>().collect();
        let expected = [
            0.0, 0.0, 0.0, // x
            0.0, 0.0, 0.0, 1.0, 1.0, 1.0, // octave 0
            0.0, 0.0, 0.0, 1.0, 1.0, 1.0, // octave 1
        ];
        assert_eq!(values, expected);
    }

    #[test]
    fn test_octaves_double_frequency() {
        let device = Default::default();
        let encoder = FrequencyEncoderConfig::new().with_input_dim(1).with_multires(3).init();
        let x = Tensor::<NdArray, 2>::from_floats([[0.3]], &device);

        let values: Vec<f32> = encoder.forward(x).into_data().iter::<f32>().collect();
        assert!((values[0] - 0.3).abs() < 1e-6);
        for octave in 0..3 {
            let angle = 0.3 * (1 << octave) as f32;
            assert!((values[1 + 2 * octave] - angle.sin()).abs() < 1e-6);
            assert!((values[2 + 2 * octave] - angle.cos()).abs() < 1e-6);
        }
    }
}
