//! Activations with custom gradient behaviour.

use burn::prelude::*;

/// Exponent range used by the backward pass of [`trunc_exp`].
pub const TRUNC_EXP_LIMIT: f32 = 15.0;

/// Exponential whose gradient is computed from a clamped input.
///
/// The forward value is `exp(x)`; the backward pass uses
/// `exp(clamp(x, -15, 15))` so large density logits cannot blow up the
/// gradients. Built from detached terms, which keeps it backend-agnostic.
pub fn trunc_exp<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let clamped = x.clone().clamp(-TRUNC_EXP_LIMIT, TRUNC_EXP_LIMIT);

    // Value of `clamped`, gradient of identity.
    let surrogate = x.clone() - (x.clone() - clamped).detach();
    let head = surrogate.exp();

    head.clone() + (x.exp() - head).detach()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;
    type TestAutodiff = Autodiff<NdArray>;

    #[test]
    fn test_trunc_exp_forward_matches_exp() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([-2.0, 0.0, 1.0, 3.5], &device);

        let values: Vec<f32> = trunc_exp(x).into_data().iter::<f32>().collect();
        let expected = [(-2.0f32).exp(), 1.0, 1.0f32.exp(), 3.5f32.exp()];

        for (value, expected) in values.iter().zip(expected.iter()) {
            assert!((value - expected).abs() <= expected * 1e-5);
        }
    }

    #[test]
    fn test_trunc_exp_zero_feature_density() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([0.0 - 1.0], &device);

        let value: f32 = trunc_exp(x).into_scalar();
        assert!((value - (-1.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_trunc_exp_gradient_inside_range() {
        let device = Default::default();
        let x = Tensor::<TestAutodiff, 1>::from_floats([2.0], &device).require_grad();

        let grads = trunc_exp(x.clone()).sum().backward();
        let grad: f32 = x.grad(&grads).expect("gradient for x").into_scalar();

        assert!((grad - 2.0f32.exp()).abs() < 1e-4);
    }

    #[test]
    fn test_trunc_exp_gradient_is_clamped() {
        let device = Default::default();
        let x = Tensor::<TestAutodiff, 1>::from_floats([20.0], &device).require_grad();

        let y = trunc_exp(x.clone());
        let value: f32 = y.clone().inner().into_scalar();
        assert!((value - 20.0f32.exp()).abs() <= 20.0f32.exp() * 1e-5);

        let grads = y.sum().backward();
        let grad: f32 = x.grad(&grads).expect("gradient for x").into_scalar();

        let limit = TRUNC_EXP_LIMIT.exp();
        assert!((grad - limit).abs() <= limit * 1e-5);
    }
}
