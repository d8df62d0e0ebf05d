// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization.
//
// The plane is split into a grid of tiles. Each tile gets a clipped histogram
// and a cumulative mapping; every pixel is then mapped through the four
// nearest tile mappings and blended bilinearly. Two conventions are offered:
//
// * `equalize_adapthist`: array-library flavour. Clip limit is a fraction of
//   the tile area, input is min-max stretched over 2^14 grey levels, output is
//   stretched to [0, 1].
// * `equalize_clahe`: tensor-library flavour. Clip limit is a multiple of the
//   uniform bin height, input is clamped to [0, 1], mappings are floored to
//   whole bins.

use std::ops::Range;

use ndarray::{Array2, ArrayView2};

/// Grey levels used to quantize input in the array-library convention.
pub const GRAY_LEVELS: usize = 1 << 14;

/// Default tile grid for the tensor-library convention.
pub const DEFAULT_GRID: (usize, usize) = (8, 8);

#[derive(Debug, Clone, Copy)]
enum Redistribution {
    /// Residual counts spread across the histogram at a fixed stride.
    Spread,
    /// Residual counts given to the lowest bins.
    Leading,
}

#[derive(Debug, Clone, Copy)]
struct TileGrid {
    rows: usize,
    cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    ny: usize,
    nx: usize,
}

impl TileGrid {
    fn new(rows: usize, cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        let tile_rows = tile_rows.clamp(1, rows.max(1));
        let tile_cols = tile_cols.clamp(1, cols.max(1));
        Self {
            rows,
            cols,
            tile_rows,
            tile_cols,
            ny: rows.div_ceil(tile_rows),
            nx: cols.div_ceil(tile_cols),
        }
    }

    fn bounds(&self, ty: usize, tx: usize) -> (Range<usize>, Range<usize>) {
        let r0 = ty * self.tile_rows;
        let c0 = tx * self.tile_cols;
        (
            r0..(r0 + self.tile_rows).min(self.rows),
            c0..(c0 + self.tile_cols).min(self.cols),
        )
    }

    fn tile_area(&self) -> usize {
        self.tile_rows * self.tile_cols
    }
}

fn tile_histogram(bins: &Array2<usize>, rows: Range<usize>, cols: Range<usize>, nbins: usize) -> Vec<u64> {
    let mut hist = vec![0u64; nbins];
    for r in rows {
        for c in cols.clone() {
            hist[bins[[r, c]]] += 1;
        }
    }
    hist
}

fn clip_histogram(hist: &mut [u64], limit: u64, redistribution: Redistribution) {
    let excess: u64 = hist.iter().map(|&h| h.saturating_sub(limit)).sum();
    if excess == 0 {
        return;
    }
    for h in hist.iter_mut() {
        *h = (*h).min(limit);
    }

    let nbins = hist.len() as u64;
    let increment = excess / nbins;
    let residual = (excess % nbins) as usize;
    for h in hist.iter_mut() {
        *h += increment;
    }
    match redistribution {
        Redistribution::Spread if residual > 0 => {
            let stride = (hist.len() / residual).max(1);
            for h in hist.iter_mut().step_by(stride).take(residual) {
                *h += 1;
            }
        }
        Redistribution::Spread => {}
        Redistribution::Leading => {
            for h in hist.iter_mut().take(residual) {
                *h += 1;
            }
        }
    }
}

/// Tile indices bracketing `pos` and the weight of the second one.
fn neighbours(pos: usize, tile: usize, count: usize) -> (usize, usize, f32) {
    let t = (pos as f32 + 0.5) / tile as f32 - 0.5;
    if t <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = t.floor() as usize;
    if lo + 1 >= count {
        return (count - 1, count - 1, 0.0);
    }
    (lo, lo + 1, t - lo as f32)
}

fn interpolate(bins: &Array2<usize>, luts: &[Vec<f32>], grid: &TileGrid) -> Array2<f32> {
    Array2::from_shape_fn((grid.rows, grid.cols), |(r, c)| {
        let (y0, y1, wy) = neighbours(r, grid.tile_rows, grid.ny);
        let (x0, x1, wx) = neighbours(c, grid.tile_cols, grid.nx);
        let bin = bins[[r, c]];
        let lut = |ty: usize, tx: usize| luts[ty * grid.nx + tx][bin];
        let top = (1.0 - wx) * lut(y0, x0) + wx * lut(y0, x1);
        let bottom = (1.0 - wx) * lut(y1, x0) + wx * lut(y1, x1);
        (1.0 - wy) * top + wy * bottom
    })
}

fn tile_luts<F>(bins: &Array2<usize>, grid: &TileGrid, nbins: usize, limit: u64, redistribution: Redistribution, map: F) -> Vec<Vec<f32>>
where
    F: Fn(u64, u64) -> f32,
{
    let mut luts = Vec::with_capacity(grid.ny * grid.nx);
    for ty in 0..grid.ny {
        for tx in 0..grid.nx {
            let (rows, cols) = grid.bounds(ty, tx);
            let pixels = (rows.len() * cols.len()) as u64;
            let mut hist = tile_histogram(bins, rows, cols, nbins);
            clip_histogram(&mut hist, limit, redistribution);
            let mut cdf = 0u64;
            let lut = hist
                .iter()
                .map(|&h| {
                    cdf += h;
                    map(cdf, pixels)
                })
                .collect();
            luts.push(lut);
        }
    }
    luts
}

/// Per-bin count limit when `clip` is a fraction of the `kr x kc` tile area.
fn adapthist_clip_count(clip: f32, kr: usize, kc: usize) -> u64 {
    if clip <= 0.0 {
        return u64::MAX;
    }
    ((clip * (kr * kc) as f32) as u64).max(1)
}

/// Per-bin count limit when `clip` is a multiple of the uniform bin height.
fn clahe_clip_count(clip: f32, tile_area: usize, nbins: usize) -> u64 {
    if clip <= 0.0 {
        return u64::MAX;
    }
    ((clip * tile_area as f32 / nbins as f32) as u64).max(1)
}

fn finite_range(plane: ArrayView2<'_, f32>) -> Option<(f32, f32)> {
    plane
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn stretch_unit(plane: ArrayView2<'_, f32>) -> Array2<f32> {
    match finite_range(plane) {
        Some((lo, hi)) if hi > lo => plane.mapv(|v| ((v - lo) / (hi - lo)).clamp(0.0, 1.0)),
        _ => Array2::zeros(plane.raw_dim()),
    }
}

/// Array-library CLAHE.
///
/// `kernel_size` is the tile shape, defaulting to one eighth of each
/// dimension. `clip_limit` in `(0, 1]` is the fraction of the tile area a bin
/// may hold; `0` disables clipping.
pub fn equalize_adapthist(
    plane: ArrayView2<'_, f32>,
    kernel_size: Option<(usize, usize)>,
    clip_limit: f32,
    nbins: usize,
) -> Array2<f32> {
    let (rows, cols) = plane.dim();
    if rows == 0 || cols == 0 {
        return plane.to_owned();
    }
    let nbins = nbins.max(1);
    let (kr, kc) = kernel_size.unwrap_or(((rows / 8).max(1), (cols / 8).max(1)));
    let grid = TileGrid::new(rows, cols, kr, kc);

    let levels = GRAY_LEVELS as f32 - 1.0;
    let bins = stretch_unit(plane).mapv(|v| (v * levels).round() as usize * nbins / GRAY_LEVELS);

    let limit = adapthist_clip_count(clip_limit, kr, kc);

    let luts = tile_luts(&bins, &grid, nbins, limit, Redistribution::Spread, |cdf, pixels| {
        (cdf as f32 / pixels as f32).min(1.0)
    });
    let equalized = interpolate(&bins, &luts, &grid);
    stretch_unit(equalized.view())
}

/// Tensor-library CLAHE on a plane with values in `[0, 1]`.
///
/// `grid` is the number of tiles along each axis. `clip_limit` is a multiple
/// of the uniform bin height `tile_area / nbins`; `0` disables clipping.
pub fn equalize_clahe(
    plane: ArrayView2<'_, f32>,
    clip_limit: f32,
    grid: (usize, usize),
    nbins: usize,
) -> Array2<f32> {
    let (rows, cols) = plane.dim();
    if rows == 0 || cols == 0 {
        return plane.to_owned();
    }
    let nbins = nbins.max(2);
    let grid = TileGrid::new(
        rows,
        cols,
        rows.div_ceil(grid.0.max(1)),
        cols.div_ceil(grid.1.max(1)),
    );

    let bins = plane.mapv(|v| ((v.clamp(0.0, 1.0) * nbins as f32) as usize).min(nbins - 1));

    let limit = clahe_clip_count(clip_limit, grid.tile_area(), nbins);

    let top = (nbins - 1) as f32;
    let luts = tile_luts(&bins, &grid, nbins, limit, Redistribution::Leading, |cdf, pixels| {
        (cdf as f32 * top / pixels as f32).clamp(0.0, top).floor() / top
    });
    interpolate(&bins, &luts, &grid)
}
