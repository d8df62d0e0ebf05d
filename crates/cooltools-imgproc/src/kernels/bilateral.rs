// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bilateral blur: edge-preserving smoothing that weights each neighbour by its
// spatial distance and its intensity distance from the centre pixel.

use ndarray::{Array2, ArrayView2};

use super::gaussian::{BoundaryMode, gaussian_kernel_1d, resolve_index};

/// Bilateral blur of a plane.
///
/// * `kernel`: window size `(rows, cols)`, both odd.
/// * `sigma_color`: intensity sigma; the range weight is
///   `exp(-0.5 * (|centre - neighbour| / sigma_color)^2)`.
/// * `sigma_space`: Gaussian sigma along rows and along columns.
///
/// The spatial kernel is the outer product of two normalised 1D Gaussians.
/// Samples beyond the edge are mirrored.
pub fn bilateral_blur(
    plane: ArrayView2<'_, f32>,
    kernel: (usize, usize),
    sigma_color: f32,
    sigma_space: (f32, f32),
) -> Array2<f32> {
    let (rows, cols) = plane.dim();
    let radius_r = kernel.0 / 2;
    let radius_c = kernel.1 / 2;
    let taps_r = gaussian_kernel_1d(sigma_space.0, radius_r);
    let taps_c = gaussian_kernel_1d(sigma_space.1, radius_c);
    // Range weights in f64 so a tiny sigma cannot underflow into NaN weights.
    let sigma_color = f64::from(sigma_color);

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let centre = plane[[r, c]];
        let mut sum = 0.0f64;
        let mut weight_sum = 0.0f64;

        for (ky, &wy) in taps_r.iter().enumerate() {
            let Some(y) = resolve_index(r as isize + ky as isize - radius_r as isize, rows, BoundaryMode::Mirror) else {
                continue;
            };
            for (kx, &wx) in taps_c.iter().enumerate() {
                let Some(x) = resolve_index(c as isize + kx as isize - radius_c as isize, cols, BoundaryMode::Mirror) else {
                    continue;
                };
                let neighbour = plane[[y, x]];
                let ratio = f64::from(centre - neighbour) / sigma_color;
                let weight = f64::from(wy * wx) * (-0.5 * ratio * ratio).exp();
                sum += weight * f64::from(neighbour);
                weight_sum += weight;
            }
        }

        if weight_sum > 0.0 { (sum / weight_sum) as f32 } else { centre }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_plane_is_preserved() {
        let plane = Array2::from_elem((6, 6), 0.25f32);
        let out = bilateral_blur(plane.view(), (3, 3), 0.1, (10.0, 10.0));
        assert!(out.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn vanishing_sigmas_leave_pixels_untouched() {
        let plane = Array2::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as f32 / 25.0);
        let out = bilateral_blur(plane.view(), (3, 3), 1e-23, (1.0, 1.0));
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out, plane);

        let out = bilateral_blur(plane.view(), (3, 3), 0.1, (1e-23, 1e-23));
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out, plane);
    }

    #[test]
    fn strong_edges_are_kept() {
        let plane = Array2::from_shape_fn((8, 8), |(_, c)| if c < 4 { 0.0 } else { 1.0 });
        let out = bilateral_blur(plane.view(), (5, 5), 0.05, (10.0, 10.0));
        assert!(out[[4, 3]] < 0.01);
        assert!(out[[4, 4]] > 0.99);
    }

    #[test]
    fn small_variations_are_smoothed() {
        let plane = Array2::from_shape_fn((8, 8), |(r, c)| 0.5 + if (r + c) % 2 == 0 { 0.01 } else { -0.01 });
        let out = bilateral_blur(plane.view(), (3, 3), 0.5, (2.0, 2.0));
        assert!((out[[4, 4]] - 0.5).abs() < 0.01);
    }
}
