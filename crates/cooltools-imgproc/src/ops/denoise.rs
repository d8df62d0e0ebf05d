// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Total-variation denoising.

use cooltools_core::error::Result;
use cooltools_core::{Backend, Dtype, ImageData, Layer};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{derived_layer, require_positive};
use crate::kernels::tv::{DEFAULT_EPS, DEFAULT_MAX_ITERATIONS, denoise_tv_chambolle};
use crate::progress::Progress;
use crate::stack::{map_planes, validate_rank};

pub const SUFFIX: &str = "_TV";
pub const PROGRESS_LABEL: &str = "Denoise(TV)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseParams {
    /// Denoising strength. Larger values give flatter regions.
    pub weight: f32,
    pub backend: Backend,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            weight: 0.1,
            backend: Backend::Cpu,
        }
    }
}

#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), weight = params.weight))]
pub fn apply(layer: &Layer, params: &DenoiseParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    require_positive("weight", params.weight)?;
    info!("TV denoising started");

    let unit = layer.data.to_unit_float();
    let denoised = map_planes(&unit, PROGRESS_LABEL, params.backend.into(), progress, |plane| {
        Ok(denoise_tv_chambolle(plane, params.weight, DEFAULT_EPS, DEFAULT_MAX_ITERATIONS))
    })?;

    info!("TV denoising complete");
    Ok(derived_layer(layer, ImageData::new(denoised, Dtype::F32), SUFFIX, "denoise_tv"))
}
