// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Point-wise intensity curves: gamma, logarithmic, min-max rescaling, and
// unsharp masking.

use ndarray::{Array2, ArrayView2, Dimension};

use super::gaussian::{BoundaryMode, gaussian_filter};

/// Power-law curve `((x / scale) ^ gamma) * scale * gain`.
pub fn gamma_curve(plane: ArrayView2<'_, f32>, gamma: f32, gain: f32, scale: f32) -> Array2<f32> {
    plane.mapv(|v| (v / scale).powf(gamma) * scale * gain)
}

/// Logarithmic curve `log2(1 + x / scale) * scale * gain`, or with `inv` the
/// inverse `(2 ^ (x / scale) - 1) * scale * gain`.
pub fn log_curve(plane: ArrayView2<'_, f32>, gain: f32, inv: bool, scale: f32) -> Array2<f32> {
    if inv {
        plane.mapv(|v| ((v / scale).exp2() - 1.0) * scale * gain)
    } else {
        plane.mapv(|v| (1.0 + v / scale).log2() * scale * gain)
    }
}

/// Tensor-library logarithmic curve: `gain * log2(1 + x)` (inverse
/// `gain * (2 ^ x - 1)`), optionally clipped to `[0, 1]`.
pub fn log_curve_tensor(plane: ArrayView2<'_, f32>, gain: f32, inv: bool, clip_output: bool) -> Array2<f32> {
    plane.mapv(|v| {
        let out = if inv { gain * (v.exp2() - 1.0) } else { gain * (1.0 + v).log2() };
        if clip_output { out.clamp(0.0, 1.0) } else { out }
    })
}

/// Affine min-max rescale of the whole buffer onto `[min_val, max_val]`.
///
/// A constant buffer maps every value to `min_val`.
pub fn rescale_range<D: Dimension>(
    array: &ndarray::Array<f32, D>,
    min_val: f32,
    max_val: f32,
) -> ndarray::Array<f32, D> {
    let bounds = array
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f32, f32)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
    match bounds {
        Some((lo, hi)) if hi > lo => {
            let span = max_val - min_val;
            array.mapv(|v| span * ((v - lo) / (hi - lo)) + min_val)
        }
        _ => array.mapv(|_| min_val),
    }
}

/// Unsharp mask: `x + amount * (x - gaussian(x, radius))`, optionally clipped
/// to `clip`.
pub fn unsharp_mask(
    plane: ArrayView2<'_, f32>,
    radius: f32,
    amount: f32,
    clip: Option<(f32, f32)>,
) -> Array2<f32> {
    let blurred = gaussian_filter(plane, radius, 4.0, BoundaryMode::Nearest, 0.0);
    let mut sharpened = &plane + &((&plane - &blurred) * amount);
    if let Some((lo, hi)) = clip {
        sharpened.mapv_inplace(|v| v.clamp(lo, hi));
    }
    sharpened
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn, array};

    #[test]
    fn gamma_one_is_identity_and_two_darkens() {
        let plane = array![[0.0f32, 64.0], [128.0, 255.0]];
        let same = gamma_curve(plane.view(), 1.0, 1.0, 255.0);
        for (a, b) in plane.iter().zip(same.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
        let dark = gamma_curve(plane.view(), 2.0, 1.0, 255.0);
        assert!(dark[[1, 0]] < 128.0);
        assert!((dark[[1, 1]] - 255.0).abs() < 1e-3);
    }

    #[test]
    fn log_and_inverse_log_undo_each_other() {
        let plane = array![[0.0f32, 0.25], [0.5, 1.0]];
        let forward = log_curve(plane.view(), 1.0, false, 1.0);
        let back = log_curve(forward.view(), 1.0, true, 1.0);
        for (a, b) in plane.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
        assert_eq!(forward[[1, 1]], 1.0);
    }

    #[test]
    fn tensor_log_clips_output() {
        let plane = array![[3.0f32]];
        assert_eq!(log_curve_tensor(plane.view(), 1.0, false, true)[[0, 0]], 1.0);
        assert_eq!(log_curve_tensor(plane.view(), 1.0, false, false)[[0, 0]], 2.0);
    }

    #[test]
    fn rescale_hits_both_ends() {
        let data = Array::from_shape_vec(IxDyn(&[2, 2]), vec![2.0f32, 4.0, 6.0, 10.0]).unwrap();
        let out = rescale_range(&data, -1.0, 1.0);
        assert_eq!(out[[0, 0]], -1.0);
        assert_eq!(out[[1, 1]], 1.0);
        assert_eq!(out[[0, 1]], -0.5);
    }

    #[test]
    fn rescale_constant_fills_min() {
        let data = Array::from_elem(IxDyn(&[3, 2, 2]), 7.0f32);
        let out = rescale_range(&data, 0.5, 1.0);
        assert!(out.iter().all(|&v| v == 0.5));
    }

    #[test]
    fn unsharp_boosts_a_step() {
        let plane = Array2::from_shape_fn((5, 8), |(_, c)| if c < 4 { 0.2 } else { 0.8 });
        let out = unsharp_mask(plane.view(), 1.0, 1.0, Some((0.0, 1.0)));
        assert!(out[[2, 4]] > 0.8);
        assert!(out[[2, 3]] < 0.2);
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
