// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization of a layer.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Backend, ImageData, Layer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::derived_layer;
use super::normalize::normalize_data;
use crate::kernels::clahe::{DEFAULT_GRID, equalize_adapthist, equalize_clahe};
use crate::progress::Progress;
use crate::stack::{map_planes, validate_rank};

pub const SUFFIX: &str = "_CLAHE";
pub const PROGRESS_LABEL: &str = "Current image";

/// Clip limit used on the CPU backend: fraction of the tile area.
pub const CPU_CLIP_LIMIT: f32 = 0.01;
/// Clip limit used on the accelerated backend: multiple of the uniform bin
/// height.
pub const ACCELERATED_CLIP_LIMIT: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    /// Tile shape on the CPU backend. `None` uses one eighth of each axis.
    pub kernel_size: Option<(usize, usize)>,
    /// `None` picks the backend's default.
    pub clip_limit: Option<f32>,
    pub nbins: usize,
    /// Range the input is stretched to before equalizing.
    pub norm_min: f32,
    pub norm_max: f32,
    pub backend: Backend,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            kernel_size: None,
            clip_limit: None,
            nbins: 256,
            norm_min: 0.0,
            norm_max: 1.0,
            backend: Backend::Accelerated,
        }
    }
}

impl ClaheParams {
    pub fn resolved_clip_limit(&self) -> f32 {
        self.clip_limit.unwrap_or(match self.backend {
            Backend::Cpu => CPU_CLIP_LIMIT,
            Backend::Accelerated => ACCELERATED_CLIP_LIMIT,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let clip = self.resolved_clip_limit();
        if !clip.is_finite() || clip < 0.0 {
            return Err(CoolToolsError::InvalidParameter(format!(
                "clip_limit must be non-negative (got {clip})"
            )));
        }
        if self.nbins < 2 {
            return Err(CoolToolsError::InvalidParameter(format!(
                "nbins must be at least 2 (got {})",
                self.nbins
            )));
        }
        if matches!(self.kernel_size, Some((r, c)) if r == 0 || c == 0) {
            return Err(CoolToolsError::InvalidParameter("kernel_size must be positive".into()));
        }
        let ordered = self.norm_min.is_finite() && self.norm_max.is_finite() && self.norm_min < self.norm_max;
        if !ordered {
            return Err(CoolToolsError::InvalidParameter(format!(
                "norm_min ({}) must be below norm_max ({})",
                self.norm_min, self.norm_max
            )));
        }
        Ok(())
    }
}

/// Equalize `layer`, returning `{name}_CLAHE` in the input's dtype.
#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), backend = ?params.backend))]
pub fn apply(layer: &Layer, params: &ClaheParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    params.validate()?;

    let clip = params.resolved_clip_limit();
    info!(clip, nbins = params.nbins, "CLAHE started");

    let normalized = normalize_data(&layer.data, params.norm_min, params.norm_max);
    debug!(min = params.norm_min, max = params.norm_max, "input pre-normalized");

    let equalized = map_planes(normalized.array(), PROGRESS_LABEL, params.backend.into(), progress, |plane| {
        Ok(match params.backend {
            Backend::Cpu => equalize_adapthist(plane, params.kernel_size, clip, params.nbins),
            Backend::Accelerated => equalize_clahe(plane, clip, DEFAULT_GRID, params.nbins),
        })
    })?;

    let dtype = layer.data.dtype();
    let output = ImageData::new(equalized.mapv(|v| dtype.from_unit(v)), dtype);

    info!("CLAHE complete");
    Ok(derived_layer(layer, output, SUFFIX, "clahe"))
}
