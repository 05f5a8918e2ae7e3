use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::volume::VoxelSpacing;

/// Longest frame edge produced by stretching. Planes already larger than
/// this keep their native size.
pub(crate) const MAX_FRAME_EDGE: usize = 2048;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Frame size (width, height) that keeps the in-plane aspect ratio when
    /// looking down the z axis.
    pub(crate) fn get_isotropic_dimensions(
        spacing: VoxelSpacing,
        original_dim: (usize, usize),
    ) -> (usize, usize) {
        let (x_spacing, y_spacing, _) = spacing.as_tuple();
        let inv_min_spacing = 1.0 / x_spacing.min(y_spacing);

        let stretched_x = original_dim.0 as f64 * x_spacing * inv_min_spacing;
        let stretched_y = original_dim.1 as f64 * y_spacing * inv_min_spacing;

        let limit = MAX_FRAME_EDGE.max(original_dim.0).max(original_dim.1) as f64;
        let scale = (limit / stretched_x.max(stretched_y)).min(1.0);

        let new_x = (stretched_x * scale).round() as usize;
        let new_y = (stretched_y * scale).round() as usize;

        (new_x.max(1), new_y.max(1))
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(plane: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = plane.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = plane[[y0, x0]];
        let v01 = plane[[y0, x1]];
        let v10 = plane[[y1, x0]];
        let v11 = plane[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }

    /// Resample a `(height, width)` plane to `width x height` using pixel-centre mapping.
    pub(crate) fn resample(plane: &ArrayView2<f32>, width: usize, height: usize) -> Array2<f32> {
        let (plane_height, plane_width) = plane.dim();
        if (plane_height, plane_width) == (height, width) {
            return plane.to_owned();
        }

        let values: Vec<f32> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).map(move |x| {
                    let norm_x = (x as f32 + 0.5) / width as f32;
                    let norm_y = (y as f32 + 0.5) / height as f32;

                    let src_x = norm_x * plane_width as f32 - 0.5;
                    let src_y = norm_y * plane_height as f32 - 0.5;

                    let src_x = src_x.max(0.0).min((plane_width - 1) as f32);
                    let src_y = src_y.max(0.0).min((plane_height - 1) as f32);

                    Self::bilinear_interpolate(plane, src_y, src_x)
                })
            })
            .collect();

        Array2::from_shape_vec((height, width), values)
            .unwrap_or_else(|_| Array2::zeros((height, width)))
    }
}
