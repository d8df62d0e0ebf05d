// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Band-pass filtering by difference of Gaussians.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Backend, Dtype, ImageData, Layer};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{derived_layer, require_non_negative, require_positive};
use crate::kernels::exposure::rescale_range;
use crate::kernels::gaussian::{BoundaryMode, difference_of_gaussians, gaussian_blur_difference};
use crate::progress::Progress;
use crate::stack::{map_planes, validate_rank};

pub const SUFFIX: &str = "_Band-pass";
pub const PROGRESS_LABEL: &str = "Band-pass(DoG)";

/// High sigma used when none is given, as a multiple of the low sigma.
pub const DEFAULT_SIGMA_RATIO: f32 = 1.6;

/// Parameters for [`apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandPassParams {
    /// Sigma of the narrow blur (keeps detail above this scale).
    pub low_sigma: f32,
    /// Sigma of the wide blur. `None` means `1.6 * low_sigma`.
    pub high_sigma: Option<f32>,
    /// Border handling on the CPU backend.
    pub mode: BoundaryMode,
    /// Fill value for [`BoundaryMode::Constant`].
    pub cval: f32,
    /// Kernel cut-off in standard deviations.
    pub truncate: f32,
    /// Min-max rescale the result to `[0, 1]`.
    pub normalize: bool,
    pub backend: Backend,
}

impl Default for BandPassParams {
    fn default() -> Self {
        Self {
            low_sigma: 1.0,
            high_sigma: Some(20.0),
            mode: BoundaryMode::Nearest,
            cval: 0.0,
            truncate: 4.0,
            normalize: false,
            backend: Backend::Cpu,
        }
    }
}

impl BandPassParams {
    pub fn resolved_high_sigma(&self) -> f32 {
        self.high_sigma.unwrap_or(self.low_sigma * DEFAULT_SIGMA_RATIO)
    }

    pub fn validate(&self) -> Result<()> {
        require_non_negative("low_sigma", self.low_sigma)?;
        let high = self.resolved_high_sigma();
        require_non_negative("high_sigma", high)?;
        require_positive("truncate", self.truncate)?;
        if high < self.low_sigma {
            return Err(CoolToolsError::InvalidParameter(format!(
                "high_sigma ({high}) must be equal to or larger than low_sigma ({})",
                self.low_sigma
            )));
        }
        Ok(())
    }
}

/// Band-pass `layer`, returning a new float layer named `{name}_Band-pass`.
#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), backend = ?params.backend))]
pub fn apply(layer: &Layer, params: &BandPassParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    params.validate()?;

    let low = params.low_sigma;
    let high = params.resolved_high_sigma();
    info!(low, high, "Band-pass filtering started");

    let unit = layer.data.to_unit_float();
    let filtered = map_planes(&unit, PROGRESS_LABEL, params.backend.into(), progress, |plane| {
        Ok(match params.backend {
            Backend::Cpu => difference_of_gaussians(plane, low, high, params.truncate, params.mode, params.cval),
            Backend::Accelerated => gaussian_blur_difference(plane, low, high, params.truncate),
        })
    })?;

    let filtered = if params.normalize {
        rescale_range(&filtered, 0.0, 1.0)
    } else {
        filtered
    };

    info!("Band-pass filtering complete");
    Ok(derived_layer(layer, ImageData::new(filtered, Dtype::F32), SUFFIX, "band_pass"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use ndarray::{Array2, Array3};

    fn spot_layer() -> Layer {
        let mut plane = Array2::zeros((32, 32));
        plane[[16, 16]] = 255.0;
        Layer::create(ImageData::from_plane(plane, Dtype::U8), "cells")
    }

    #[test]
    fn names_output_with_suffix() {
        let out = apply(&spot_layer(), &BandPassParams::default(), &NoProgress).unwrap();
        assert_eq!(out.name, "cells_Band-pass");
        assert_eq!(out.data.dtype(), Dtype::F32);
        assert_eq!(out.metadata.get("operation").map(String::as_str), Some("band_pass"));
    }

    #[test]
    fn stack_keeps_shape_and_filters_each_slice() {
        let mut stack = Array3::zeros((3, 16, 16));
        stack[[1, 8, 8]] = 1.0;
        let layer = Layer::create(ImageData::from_stack(stack, Dtype::F32), "vol");
        for backend in [Backend::Cpu, Backend::Accelerated] {
            let params = BandPassParams { high_sigma: Some(3.0), backend, ..Default::default() };
            let out = apply(&layer, &params, &NoProgress).unwrap();
            assert_eq!(out.data.shape(), &[3, 16, 16]);
            assert!(out.data.array()[[1, 8, 8]] > 0.0);
            assert!(out.data.array()[[0, 8, 8]].abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_maps_to_unit_range() {
        let params = BandPassParams { normalize: true, high_sigma: None, ..Default::default() };
        let out = apply(&spot_layer(), &params, &NoProgress).unwrap();
        let (lo, hi) = out.data.min_max().unwrap();
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
    }

    #[test]
    fn high_sigma_below_low_is_rejected() {
        let params = BandPassParams { low_sigma: 5.0, high_sigma: Some(2.0), ..Default::default() };
        let err = apply(&spot_layer(), &params, &NoProgress).unwrap_err();
        assert!(matches!(err, CoolToolsError::InvalidParameter(_)));
    }

    #[test]
    fn default_high_sigma_is_ratio_of_low() {
        let params = BandPassParams { low_sigma: 2.0, high_sigma: None, ..Default::default() };
        assert!((params.resolved_high_sigma() - 3.2).abs() < 1e-6);
    }
}
