//! Trilinear sampling of dense voxel volumes.

use burn::prelude::*;

use crate::lattice::{Interpolation, Lookup, host_coords};

/// Sample a `[1, C, D, H, W]` volume at normalised coordinates.
///
/// `coords` is `[N, 3]` in `[-1, 1]`, ordered `(x, y, z)` with `x` along `W`.
/// Corners are aligned with the outermost voxels and anything outside the
/// volume reads as zero. Returns `[N, C]`.
pub fn sample_trilinear<B: Backend>(volume: Tensor<B, 5>, coords: Tensor<B, 2>) -> Tensor<B, 2> {
    let [_, channels, depth, height, width] = volume.dims();
    let [points, dim] = coords.dims();
    assert_eq!(dim, 3, "trilinear sampling expects 3D coordinates");

    let extent = [width as i64, height as i64, depth as i64];
    let values = host_coords(coords);

    let mut lookup = Lookup::with_capacity(points * 8);
    let mut pos = [0f32; 3];
    for point in values.chunks_exact(3) {
        for d in 0..3 {
            pos[d] = (point[d] + 1.0) * 0.5 * (extent[d] - 1) as f32;
        }
        if pos.iter().any(|p| !p.is_finite()) {
            lookup.push_empty(8);
            continue;
        }
        lookup.push_cell(&pos, Interpolation::Linear, |corner| {
            let inside = corner.iter().zip(extent.iter()).all(|(c, e)| (0..*e).contains(c));
            inside.then(|| (corner[2] * extent[1] * extent[0] + corner[1] * extent[0] + corner[0]) as usize)
        });
    }

    let table = volume
        .reshape([channels, depth * height * width])
        .transpose();

    lookup.blend(table, points, 1, 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn ramp_volume(resolution: usize) -> Tensor<TestBackend, 5> {
        // Value equals the x voxel index in channel 0 and z index in channel 1.
        let mut data = Vec::with_capacity(2 * resolution.pow(3));
        for channel in 0..2 {
            for z in 0..resolution {
                for _y in 0..resolution {
                    for x in 0..resolution {
                        data.push(if channel == 0 { x as f32 } else { z as f32 });
                    }
                }
            }
        }
        Tensor::from_data(
            TensorData::new(data, [1, 2, resolution, resolution, resolution]),
            &Default::default(),
        )
    }

    #[test]
    fn test_corners_hit_voxels_exactly() {
        let device = Default::default();
        let coords = Tensor::<TestBackend, 2>::from_floats(
            [[-1.0, -1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, -1.0]],
            &device,
        );

        let out: Vec<f32> = sample_trilinear(ramp_volume(5), coords)
            .into_data()
            .iter::<f32>()
            .collect();

        assert_eq!(out, vec![0.0, 0.0, 4.0, 4.0, 4.0, 0.0]);
    }

    #[test]
    fn test_interpolates_between_voxels() {
        let device = Default::default();
        // On a 4-voxel axis, 0.0 maps to index 1.5 and 0.5 to index 2.25.
        let coords = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0, 0.5]], &device);

        let out: Vec<f32> = sample_trilinear(ramp_volume(4), coords)
            .into_data()
            .iter::<f32>()
            .collect();

        assert!((out[0] - 1.5).abs() < 1e-5);
        assert!((out[1] - 2.25).abs() < 1e-5);
    }

    #[test]
    fn test_outside_volume_reads_zero() {
        let device = Default::default();
        let coords = Tensor::<TestBackend, 2>::from_floats([[3.0, 0.0, 0.0]], &device);

        let out: Vec<f32> = sample_trilinear(ramp_volume(4), coords)
            .into_data()
            .iter::<f32>()
            .collect();

        assert_eq!(out, vec![0.0, 0.0]);
    }
}
