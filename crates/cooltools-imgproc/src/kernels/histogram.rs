// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Histogram matching through cumulative distribution functions.

use ndarray::{Array2, ArrayView2};

/// Cumulative distribution of a reference image: its distinct values and the
/// fraction of pixels at or below each one.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCdf {
    values: Vec<f32>,
    quantiles: Vec<f64>,
}

impl ReferenceCdf {
    /// Build from reference pixels. Non-finite values are ignored.
    pub fn from_values(values: impl IntoIterator<Item = f32>) -> Self {
        let finite: Vec<f32> = values.into_iter().filter(|v| v.is_finite()).collect();
        let total = finite.len() as f64;
        let (values, counts) = unique_counts(finite);
        let mut cumulative = 0usize;
        let quantiles = counts
            .iter()
            .map(|&count| {
                cumulative += count;
                cumulative as f64 / total
            })
            .collect();
        Self { values, quantiles }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reference value at quantile `q`, linearly interpolated between
    /// neighbouring distinct values and clamped at both ends.
    pub fn value_at(&self, q: f64) -> f32 {
        let n = self.quantiles.len();
        if n == 0 {
            return f32::NAN;
        }
        if q <= self.quantiles[0] {
            return self.values[0];
        }
        if q >= self.quantiles[n - 1] {
            return self.values[n - 1];
        }
        let i = self.quantiles.partition_point(|&x| x <= q);
        let (x0, x1) = (self.quantiles[i - 1], self.quantiles[i]);
        let (y0, y1) = (self.values[i - 1], self.values[i]);
        y0 + (y1 - y0) * ((q - x0) / (x1 - x0)) as f32
    }
}

fn unique_counts(mut values: Vec<f32>) -> (Vec<f32>, Vec<usize>) {
    values.sort_unstable_by(f32::total_cmp);
    let mut unique: Vec<f32> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for v in values {
        match unique.last() {
            Some(&last) if last == v => {
                if let Some(count) = counts.last_mut() {
                    *count += 1;
                }
            }
            _ => {
                unique.push(v);
                counts.push(1);
            }
        }
    }
    (unique, counts)
}

/// Remap `source` so its value distribution follows `reference`.
///
/// Every distinct source value is sent to the reference value found at the
/// same cumulative quantile.
pub fn match_cumulative_cdf(source: ArrayView2<'_, f32>, reference: &ReferenceCdf) -> Array2<f32> {
    let flat: Vec<f32> = source.iter().copied().collect();
    let total = flat.len() as f64;

    let mut order: Vec<usize> = (0..flat.len()).collect();
    order.sort_unstable_by(|&a, &b| flat[a].total_cmp(&flat[b]));

    let mut mapped = vec![0.0f32; flat.len()];
    let mut start = 0;
    while start < order.len() {
        let value = flat[order[start]];
        let mut end = start + 1;
        while end < order.len() && flat[order[end]].total_cmp(&value).is_eq() {
            end += 1;
        }
        let target = reference.value_at(end as f64 / total);
        for &index in &order[start..end] {
            mapped[index] = target;
        }
        start = end;
    }

    Array2::from_shape_vec(source.raw_dim(), mapped).unwrap_or_else(|_| source.to_owned())
}
