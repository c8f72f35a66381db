//! Optimizer parameter groups
//!
//! burn optimizers take one learning rate per step, so groups are applied by
//! splitting the gradients per group and stepping once for each.

use burn::module::{AutodiffModule, Module, ParamId, list_param_ids};
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::trace;

/// A named set of parameters sharing a learning rate.
#[derive(Debug, Clone)]
pub struct ParamGroup {
    pub name: &'static str,
    pub params: Vec<ParamId>,
    pub lr: f64,
}

/// Collect every parameter of `module` into one group.
pub fn param_group<B: Backend, M: Module<B>>(name: &'static str, module: &M, lr: f64) -> ParamGroup {
    ParamGroup {
        name,
        params: list_param_ids(module),
        lr,
    }
}

/// Apply one optimizer step per group, each at the group's learning rate.
///
/// `grads` are the raw gradients of a backward pass; every group takes its
/// own parameters out of them.
pub fn step_param_groups<B, M, O>(
    optimizer: &mut O,
    module: M,
    groups: &[ParamGroup],
    mut grads: B::Gradients,
) -> M
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let mut module = module;
    for group in groups {
        let group_grads = GradientsParams::from_params(&mut grads, &module, &group.params);
        trace!(
            "Stepping group {} ({} gradients, lr {})",
            group.name,
            group_grads.len(),
            group.lr
        );
        module = optimizer.step(group.lr, module, group_grads);
    }
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::MlpConfig;
    use crate::{NerfNetwork, NetworkConfig, Shading};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;
    use burn::tensor::Distribution;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_param_group_lists_all_params() {
        let device = Default::default();
        let mlp = MlpConfig::new(4, 2, 8, 3).init::<TestBackend>(&device).unwrap();

        let group = param_group("mlp", &mlp, 1e-3);
        assert_eq!(group.name, "mlp");
        assert_eq!(group.lr, 1e-3);
        // Three weights and three biases.
        assert_eq!(group.params.len(), 6);
    }

    #[test]
    fn test_step_updates_every_group() {
        let device = Default::default();
        let network =
            NerfNetwork::<TestBackend>::new(&NetworkConfig::new().with_cuda_ray(true), &device)
                .unwrap();
        let groups = network.get_params(1e-2);

        let x = Tensor::<TestBackend, 2>::random([32, 3], Distribution::Uniform(-1.0, 1.0), &device);
        let d = Tensor::<TestBackend, 2>::random([32, 3], Distribution::Uniform(-1.0, 1.0), &device);
        let loss = |net: &NerfNetwork<TestBackend>| {
            let out = net.forward(x.clone(), d.clone(), Shading::Full);
            out.sigma.sum() + out.color.sum()
        };

        let mut probe = loss(&network).backward();
        for group in &groups {
            let grads = GradientsParams::from_params(&mut probe, &network, &group.params);
            assert!(grads.len() > 0, "group {} received no gradients", group.name);
        }

        let before: f32 = loss(&network).inner().into_scalar();
        let grads = loss(&network).backward();
        let mut optimizer = AdamConfig::new().init();
        let network = step_param_groups(&mut optimizer, network, &groups, grads);
        let after: f32 = loss(&network).inner().into_scalar();

        assert_ne!(before, after);
    }
}
