//! Conversions between `glam` vectors and field input tensors

use burn::prelude::*;
use burn::tensor::TensorData;
use glam::Vec3;

/// Pack points into a `[N, 3]` tensor.
pub fn points_to_tensor<B: Backend>(points: &[Vec3], device: &B::Device) -> Tensor<B, 2> {
    let flat: &[f32] = bytemuck::cast_slice(points);
    Tensor::from_data(
        TensorData::new(flat.to_vec(), [points.len(), 3]).convert::<B::FloatElem>(),
        device,
    )
}

/// Pack view directions into a `[N, 3]` tensor, normalising each one.
///
/// Zero-length directions stay zero.
pub fn directions_to_tensor<B: Backend>(directions: &[Vec3], device: &B::Device) -> Tensor<B, 2> {
    let unit: Vec<Vec3> = directions.iter().map(|d| d.normalize_or_zero()).collect();
    points_to_tensor(&unit, device)
}

/// Unpack a `[N, 3]` tensor (points, directions or RGB) into vectors.
pub fn tensor_to_vec3<B: Backend>(tensor: Tensor<B, 2>) -> Vec<Vec3> {
    let [_, dim] = tensor.dims();
    assert_eq!(dim, 3, "expected a [N, 3] tensor");

    let values: Vec<f32> = tensor.into_data().iter::<f32>().collect();
    values.chunks_exact(3).map(Vec3::from_slice).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_points_layout() {
        let device = Default::default();
        let points = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-4.0, 5.0, -6.0)];

        let tensor = points_to_tensor::<TestBackend>(&points, &device);
        assert_eq!(tensor.dims(), [2, 3]);

        let values: Vec<f32> = tensor.clone().into_data().iter::<f32>().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, -4.0, 5.0, -6.0]);
        assert_eq!(tensor_to_vec3(tensor), points.to_vec());
    }

    #[test]
    fn test_directions_are_normalised() {
        let device = Default::default();
        let directions = [Vec3::new(3.0, 0.0, 4.0), Vec3::ZERO];

        let unit = tensor_to_vec3(directions_to_tensor::<TestBackend>(&directions, &device));
        assert!((unit[0] - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-6);
        assert_eq!(unit[1], Vec3::ZERO);
    }
}
