// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Total-variation denoising (Chambolle's projection algorithm) for a single
// plane.

use ndarray::{Array2, ArrayView2, Zip};

/// Stopping tolerance on the relative energy change.
pub const DEFAULT_EPS: f32 = 0.0002;

/// Iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Chambolle total-variation denoising of `image`.
///
/// `weight` trades smoothness for fidelity: larger values denoise more. The
/// iteration stops once the energy changes by less than `eps` times the
/// initial energy, or after `max_iterations` steps.
pub fn denoise_tv_chambolle(
    image: ArrayView2<'_, f32>,
    weight: f32,
    eps: f32,
    max_iterations: usize,
) -> Array2<f32> {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 || weight <= 0.0 {
        return image.to_owned();
    }

    // Dual variable, one component per axis.
    let mut p_row = Array2::<f32>::zeros((rows, cols));
    let mut p_col = Array2::<f32>::zeros((rows, cols));
    let mut divergence = Array2::<f32>::zeros((rows, cols));
    let mut out = image.to_owned();

    let tau = 1.0 / 4.0;
    let size = (rows * cols) as f64;
    let mut energy_init = 0.0f64;
    let mut energy_prev = 0.0f64;

    for iteration in 0..max_iterations {
        if iteration > 0 {
            for r in 0..rows {
                for c in 0..cols {
                    let mut d = -(p_row[[r, c]] + p_col[[r, c]]);
                    if r > 0 {
                        d += p_row[[r - 1, c]];
                    }
                    if c > 0 {
                        d += p_col[[r, c - 1]];
                    }
                    divergence[[r, c]] = d;
                }
            }
            Zip::from(&mut out)
                .and(&image)
                .and(&divergence)
                .for_each(|o, &i, &d| *o = i + d);
        }

        let mut energy: f64 = divergence.iter().map(|&d| f64::from(d * d)).sum();

        for r in 0..rows {
            for c in 0..cols {
                let g_row = if r + 1 < rows { out[[r + 1, c]] - out[[r, c]] } else { 0.0 };
                let g_col = if c + 1 < cols { out[[r, c + 1]] - out[[r, c]] } else { 0.0 };
                let norm = (g_row * g_row + g_col * g_col).sqrt();
                energy += f64::from(weight * norm);
                let denom = 1.0 + norm * tau / weight;
                p_row[[r, c]] = (p_row[[r, c]] - tau * g_row) / denom;
                p_col[[r, c]] = (p_col[[r, c]] - tau * g_col) / denom;
            }
        }

        energy /= size;
        if iteration == 0 {
            energy_init = energy;
            energy_prev = energy;
        } else if (energy_prev - energy).abs() < f64::from(eps) * energy_init {
            break;
        } else {
            energy_prev = energy;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variance(values: &Array2<f32>) -> f32 {
        let mean = values.mean().unwrap();
        values.mapv(|v| (v - mean).powi(2)).mean().unwrap()
    }

    fn noisy_square() -> Array2<f32> {
        // deterministic "noise" from a hash-like sequence
        Array2::from_shape_fn((24, 24), |(r, c)| {
            let base = if (6..18).contains(&r) && (6..18).contains(&c) { 0.8 } else { 0.2 };
            let jitter = (((r * 31 + c * 17) % 11) as f32 - 5.0) * 0.02;
            base + jitter
        })
    }

    #[test]
    fn smoothing_reduces_variance_of_noise() {
        let image = noisy_square();
        let out = denoise_tv_chambolle(image.view(), 0.1, DEFAULT_EPS, DEFAULT_MAX_ITERATIONS);
        let flat_in = image.slice(ndarray::s![0..5, 0..5]).to_owned();
        let flat_out = out.slice(ndarray::s![0..5, 0..5]).to_owned();
        assert!(variance(&flat_out) < variance(&flat_in));
    }

    #[test]
    fn edges_survive_denoising() {
        let image = noisy_square();
        let out = denoise_tv_chambolle(image.view(), 0.1, DEFAULT_EPS, DEFAULT_MAX_ITERATIONS);
        assert!(out[[12, 12]] - out[[1, 1]] > 0.4);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let image = Array2::from_elem((8, 8), 0.5f32);
        let out = denoise_tv_chambolle(image.view(), 0.2, DEFAULT_EPS, 20);
        assert!(out.iter().all(|v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn mean_is_preserved() {
        let image = noisy_square();
        let out = denoise_tv_chambolle(image.view(), 0.3, DEFAULT_EPS, DEFAULT_MAX_ITERATIONS);
        assert!((out.mean().unwrap() - image.mean().unwrap()).abs() < 1e-3);
    }
}
