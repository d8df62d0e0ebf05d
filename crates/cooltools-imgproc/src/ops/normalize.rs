// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Min-max normalization into a requested range.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Dtype, ImageData, Layer};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::kernels::exposure::rescale_range;
use crate::progress::Progress;
use crate::stack::validate_rank;

pub const PROGRESS_LABEL: &str = "Normalize";

/// Prefix given to the source layer when normalizing in place.
pub const PRE_NORM_PREFIX: &str = "pre_norm_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    pub min_val: f32,
    pub max_val: f32,
    /// Take over the source layer's name, renaming the source to
    /// `pre_norm_{name}`.
    pub in_place: bool,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            min_val: 0.0,
            max_val: 1.0,
            in_place: true,
        }
    }
}

/// Result of [`apply`]: the new layer, and the name the source layer should
/// be given when normalizing in place.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub layer: Layer,
    pub renamed_source: Option<String>,
}

/// Suffix of a layer normalized out of place, e.g. `_norm_0.0_1.0`.
pub fn suffix(min_val: f32, max_val: f32) -> String {
    format!("_norm_{min_val:?}_{max_val:?}")
}

/// Rescale the whole buffer onto `[min_val, max_val]` as `F32`.
pub fn normalize_data(data: &ImageData, min_val: f32, max_val: f32) -> ImageData {
    match data.min_max() {
        Some((lo, hi)) if lo == hi => warn!(value = lo, "constant image, every value set to the minimum"),
        None => warn!("image has no finite values, every value set to the minimum"),
        _ => {}
    }
    ImageData::new(rescale_range(data.array(), min_val, max_val), Dtype::F32)
}

#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), min = params.min_val, max = params.max_val))]
pub fn apply(layer: &Layer, params: &NormalizeParams, progress: &dyn Progress) -> Result<Normalized> {
    validate_rank(&layer.data)?;
    if !params.min_val.is_finite() || !params.max_val.is_finite() {
        return Err(CoolToolsError::InvalidParameter(format!(
            "normalization bounds must be finite (got {} and {})",
            params.min_val, params.max_val
        )));
    }

    let data = normalize_data(&layer.data, params.min_val, params.max_val);
    progress.advance(PROGRESS_LABEL, 1, 1);

    let (name, renamed_source) = if params.in_place {
        (layer.name.clone(), Some(format!("{PRE_NORM_PREFIX}{}", layer.name)))
    } else {
        (layer.derived_name(&suffix(params.min_val, params.max_val)), None)
    };
    info!(output = %name, in_place = params.in_place, "normalization complete");

    let layer = Layer::create(data, name)
        .with_metadata("operation", "normalize")
        .with_metadata("source", layer.name.clone());
    Ok(Normalized { layer, renamed_source })
}
