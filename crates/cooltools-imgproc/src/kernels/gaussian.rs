// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Separable Gaussian filtering with array-library boundary modes, and the
// difference-of-Gaussians band-pass built on top of it.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// How samples beyond the image edge are produced.
///
/// Names follow the array-library convention for an edge `a b c d`:
///
/// * `Reflect`: `d c b a | a b c d | d c b a`
/// * `Mirror`: `d c b | a b c d | c b a`
/// * `Nearest`: `a a a | a b c d | d d d`
/// * `Wrap`: `b c d | a b c d | a b c`
/// * `Constant`: the caller's `cval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    Reflect,
    Constant,
    #[default]
    Nearest,
    Mirror,
    Wrap,
}

/// Map a possibly out-of-range index onto `0..len`. `None` means the sample
/// takes the constant fill value.
#[inline]
pub fn resolve_index(index: isize, len: usize, mode: BoundaryMode) -> Option<usize> {
    let n = len as isize;
    if (0..n).contains(&index) {
        return Some(index as usize);
    }
    if n == 0 {
        return None;
    }
    let resolved = match mode {
        BoundaryMode::Constant => return None,
        BoundaryMode::Nearest => index.clamp(0, n - 1),
        BoundaryMode::Wrap => index.rem_euclid(n),
        BoundaryMode::Reflect => {
            let m = index.rem_euclid(2 * n);
            if m < n { m } else { 2 * n - 1 - m }
        }
        BoundaryMode::Mirror => {
            if n == 1 {
                0
            } else {
                let period = 2 * n - 2;
                let m = index.rem_euclid(period);
                if m < n { m } else { period - m }
            }
        }
    };
    Some(resolved as usize)
}

/// Kernel radius for a Gaussian of `sigma` cut off at `truncate` standard
/// deviations: `round(truncate * sigma)`. The kernel has `2 * radius + 1` taps.
pub fn kernel_radius(sigma: f32, truncate: f32) -> usize {
    (truncate * sigma).round().max(0.0) as usize
}

/// Normalised 1D Gaussian taps of length `2 * radius + 1`.
pub fn gaussian_kernel_1d(sigma: f32, radius: usize) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    // f64 keeps `2 * sigma^2` from underflowing for tiny sigmas.
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let taps: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    taps.iter().map(|&tap| (tap / sum) as f32).collect()
}

/// Correlate every row (`axis == 1`) or column (`axis == 0`) with `kernel`.
pub fn correlate_axis(
    input: ArrayView2<'_, f32>,
    axis: usize,
    kernel: &[f32],
    mode: BoundaryMode,
    cval: f32,
) -> Array2<f32> {
    let (rows, cols) = input.dim();
    let radius = (kernel.len() / 2) as isize;
    let len = if axis == 0 { rows } else { cols };

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let centre = (if axis == 0 { r } else { c }) as isize;
        kernel
            .iter()
            .enumerate()
            .map(|(k, &weight)| {
                let sample = match resolve_index(centre + k as isize - radius, len, mode) {
                    Some(i) if axis == 0 => input[[i, c]],
                    Some(i) => input[[r, i]],
                    None => cval,
                };
                weight * sample
            })
            .sum()
    })
}

/// Isotropic Gaussian filter of a plane.
pub fn gaussian_filter(
    plane: ArrayView2<'_, f32>,
    sigma: f32,
    truncate: f32,
    mode: BoundaryMode,
    cval: f32,
) -> Array2<f32> {
    if sigma <= 0.0 {
        return plane.to_owned();
    }
    let kernel = gaussian_kernel_1d(sigma, kernel_radius(sigma, truncate));
    let rows_done = correlate_axis(plane, 0, &kernel, mode, cval);
    correlate_axis(rows_done.view(), 1, &kernel, mode, cval)
}

/// Band-pass: `gaussian(low_sigma) - gaussian(high_sigma)`.
pub fn difference_of_gaussians(
    plane: ArrayView2<'_, f32>,
    low_sigma: f32,
    high_sigma: f32,
    truncate: f32,
    mode: BoundaryMode,
    cval: f32,
) -> Array2<f32> {
    let low = gaussian_filter(plane, low_sigma, truncate, mode, cval);
    let high = gaussian_filter(plane, high_sigma, truncate, mode, cval);
    low - high
}

/// Tensor-library band-pass: difference of two Gaussian blurs whose square
/// kernels have side `2 * round(truncate * sigma) + 1`, with a mirrored
/// border.
pub fn gaussian_blur_difference(
    plane: ArrayView2<'_, f32>,
    low_sigma: f32,
    high_sigma: f32,
    truncate: f32,
) -> Array2<f32> {
    difference_of_gaussians(plane, low_sigma, high_sigma, truncate, BoundaryMode::Mirror, 0.0)
}
