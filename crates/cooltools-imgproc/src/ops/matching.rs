// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Histogram matching of a layer against a reference layer.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Backend, Dtype, ImageData};
use ndarray::{Array2, ArrayView2};
use tracing::{info, instrument};

use crate::kernels::histogram::{ReferenceCdf, match_cumulative_cdf};
use crate::progress::Progress;
use crate::stack::{map_planes, validate_rank};

pub const PROGRESS_LABEL: &str = "Match Histogram";

/// Match one plane against a set of reference pixel values.
pub fn match_histograms(source: ArrayView2<'_, f32>, reference: &[f32]) -> Array2<f32> {
    match_cumulative_cdf(source, &ReferenceCdf::from_values(reference.iter().copied()))
}

/// Match every plane of `target` against the full histogram of `reference`.
///
/// The result keeps the target's shape and dtype.
#[instrument(skip_all, fields(target = ?target.shape(), reference = ?reference.shape()))]
pub fn apply(target: &ImageData, reference: &ImageData, backend: Backend, progress: &dyn Progress) -> Result<ImageData> {
    validate_rank(target)?;
    validate_rank(reference)?;

    let cdf = ReferenceCdf::from_values(reference.array().iter().copied());
    if cdf.is_empty() {
        return Err(CoolToolsError::InvalidParameter(
            "reference image has no finite values".into(),
        ));
    }

    let matched = map_planes(target.array(), PROGRESS_LABEL, backend.into(), progress, |plane| {
        Ok(match_cumulative_cdf(plane, &cdf))
    })?;

    info!(dtype = %target.dtype(), "histogram matched");
    Ok(ImageData::new(matched, Dtype::F32).cast(target.dtype()))
}
