// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Median filtering over a disk-shaped footprint.

use ndarray::{Array2, ArrayView2};

use super::gaussian::{BoundaryMode, resolve_index};

/// Offsets `(dy, dx)` of a disk of `radius`: every point with
/// `dy^2 + dx^2 <= radius^2`.
pub fn disk_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dy * dy + dx * dx <= r * r {
                offsets.push((dy, dx));
            }
        }
    }
    offsets
}

/// Median of the disk neighbourhood of every pixel, edges replicated.
pub fn median_filter(plane: ArrayView2<'_, f32>, radius: usize) -> Array2<f32> {
    let (rows, cols) = plane.dim();
    let offsets = disk_offsets(radius);
    let mut window = Vec::with_capacity(offsets.len());

    let mut out = Array2::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            window.clear();
            for &(dy, dx) in &offsets {
                let y = resolve_index(r as isize + dy, rows, BoundaryMode::Nearest);
                let x = resolve_index(c as isize + dx, cols, BoundaryMode::Nearest);
                if let (Some(y), Some(x)) = (y, x) {
                    window.push(plane[[y, x]]);
                }
            }
            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable_by(mid, f32::total_cmp);
            out[[r, c]] = *median;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn disk_shapes() {
        assert_eq!(disk_offsets(0), vec![(0, 0)]);
        assert_eq!(disk_offsets(1).len(), 5);
        assert_eq!(disk_offsets(2).len(), 13);
    }

    #[test]
    fn removes_salt_noise() {
        let mut plane = Array2::from_elem((5, 5), 10.0f32);
        plane[[2, 2]] = 255.0;
        let out = median_filter(plane.view(), 1);
        assert_eq!(out[[2, 2]], 10.0);
    }

    #[test]
    fn radius_zero_is_identity() {
        let plane = array![[1.0f32, 5.0], [3.0, 2.0]];
        assert_eq!(median_filter(plane.view(), 0), plane);
    }
}
