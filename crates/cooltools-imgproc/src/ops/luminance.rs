// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Luminance correction: gamma and logarithmic curves.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Backend, Dtype, ImageData, Layer};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::derived_layer;
use crate::kernels::exposure::{gamma_curve, log_curve, log_curve_tensor};
use crate::progress::Progress;
use crate::stack::{Execution, map_planes, validate_rank};

pub const SUFFIX: &str = "_LC";
pub const GAMMA_LABEL: &str = "Gamma Correction";
pub const LOG_LABEL: &str = "Log Correction";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaParams {
    pub gamma: f32,
    pub gain: f32,
}

impl Default for GammaParams {
    fn default() -> Self {
        Self { gamma: 1.0, gain: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogParams {
    pub gain: f32,
    /// Apply the inverse curve.
    pub inv: bool,
    pub backend: Backend,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            inv: false,
            backend: Backend::Accelerated,
        }
    }
}

/// Width of the dtype's intensity range.
fn curve_scale(dtype: Dtype) -> f32 {
    if dtype.is_integer() {
        let (lo, hi) = dtype.limits();
        hi - lo
    } else {
        1.0
    }
}

fn reject_negative(data: &ImageData) -> Result<()> {
    if data.has_negative() {
        return Err(CoolToolsError::NegativeValues);
    }
    Ok(())
}

fn require_finite(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(CoolToolsError::InvalidParameter(format!("{name} must be finite (got {value})")));
    }
    Ok(())
}

/// Gamma curve `((x / scale) ^ gamma) * scale * gain`, cast back to the input
/// dtype.
#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), gamma = params.gamma, gain = params.gain))]
pub fn gamma(layer: &Layer, params: &GammaParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    require_finite("gain", params.gain)?;
    if !params.gamma.is_finite() || params.gamma < 0.0 {
        return Err(CoolToolsError::InvalidParameter(format!(
            "gamma should be a non-negative real number (got {})",
            params.gamma
        )));
    }
    reject_negative(&layer.data)?;

    let dtype = layer.data.dtype();
    let scale = curve_scale(dtype);
    let corrected = map_planes(layer.data.array(), GAMMA_LABEL, Execution::Sequential, progress, |plane| {
        Ok(gamma_curve(plane, params.gamma, params.gain, scale))
    })?;

    info!(%dtype, "gamma correction complete");
    // 8-bit output goes through a rounded lookup; wider types truncate.
    let output = match dtype {
        Dtype::U8 => ImageData::new(corrected.mapv(|v| dtype.saturate(v.round())), dtype),
        _ => ImageData::new(corrected, Dtype::F32).cast(dtype),
    };
    Ok(derived_layer(layer, output, SUFFIX, "gamma"))
}

/// Logarithmic curve. The CPU backend works in the dtype's range and casts
/// back; the accelerated backend works on raw values and clips to `[0, 1]`.
#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), gain = params.gain, inv = params.inv, backend = ?params.backend))]
pub fn log(layer: &Layer, params: &LogParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    require_finite("gain", params.gain)?;

    let output = match params.backend {
        Backend::Cpu => {
            reject_negative(&layer.data)?;
            let dtype = layer.data.dtype();
            let scale = curve_scale(dtype);
            let corrected = map_planes(layer.data.array(), LOG_LABEL, params.backend.into(), progress, |plane| {
                Ok(log_curve(plane, params.gain, params.inv, scale))
            })?;
            ImageData::new(corrected, Dtype::F32).cast(dtype)
        }
        Backend::Accelerated => {
            let corrected = map_planes(layer.data.array(), LOG_LABEL, params.backend.into(), progress, |plane| {
                Ok(log_curve_tensor(plane, params.gain, params.inv, true))
            })?;
            ImageData::new(corrected, Dtype::F32)
        }
    };

    info!(dtype = %output.dtype(), "log correction complete");
    Ok(derived_layer(layer, output, SUFFIX, "log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use ndarray::{Array3, array};

    fn u8_layer() -> Layer {
        Layer::create(ImageData::from_plane(array![[0.0, 64.0], [128.0, 255.0]], Dtype::U8), "img")
    }

    #[test]
    fn gamma_identity_keeps_values_and_dtype() {
        let out = gamma(&u8_layer(), &GammaParams::default(), &NoProgress).unwrap();
        assert_eq!(out.name, "img_LC");
        assert_eq!(out.data.dtype(), Dtype::U8);
        assert_eq!(out.data.array()[[1, 1]], 255.0);
        assert_eq!(out.data.array()[[0, 0]], 0.0);
        assert!((out.data.array()[[1, 0]] - 128.0).abs() <= 1.0);
    }

    #[test]
    fn gamma_above_one_darkens_midtones() {
        let params = GammaParams { gamma: 2.0, ..Default::default() };
        let out = gamma(&u8_layer(), &params, &NoProgress).unwrap();
        assert!(out.data.array()[[1, 0]] < 70.0);
    }

    #[test]
    fn gamma_rounds_u8_and_truncates_u16() {
        let params = GammaParams { gamma: 0.5, ..Default::default() };
        let small = Layer::create(ImageData::from_plane(array![[2.0, 255.0]], Dtype::U8), "dim");
        let out = gamma(&small, &params, &NoProgress).unwrap();
        assert_eq!(out.data.array()[[0, 0]], 23.0);
        assert_eq!(out.data.array()[[0, 1]], 255.0);

        let wide = Layer::create(ImageData::from_plane(array![[10.0]], Dtype::U16), "dim");
        let out = gamma(&wide, &params, &NoProgress).unwrap();
        assert_eq!(out.data.dtype(), Dtype::U16);
        assert_eq!(out.data.array()[[0, 0]], 809.0);
    }

    #[test]
    fn gamma_rejects_negative_gamma_and_pixels() {
        let params = GammaParams { gamma: -0.5, ..Default::default() };
        assert!(matches!(gamma(&u8_layer(), &params, &NoProgress), Err(CoolToolsError::InvalidParameter(_))));

        let neg = Layer::create(ImageData::from_plane(array![[-0.2, 0.4]], Dtype::F32), "neg");
        assert!(matches!(gamma(&neg, &GammaParams::default(), &NoProgress), Err(CoolToolsError::NegativeValues)));
    }

    #[test]
    fn cpu_log_casts_back_to_input_dtype() {
        let params = LogParams { backend: Backend::Cpu, ..Default::default() };
        let out = log(&u8_layer(), &params, &NoProgress).unwrap();
        assert_eq!(out.data.dtype(), Dtype::U8);
        assert_eq!(out.data.array()[[1, 1]], 255.0);
        assert!(out.data.array()[[1, 0]] > 128.0);
    }

    #[test]
    fn accelerated_log_is_float_and_clipped() {
        let out = log(&u8_layer(), &LogParams::default(), &NoProgress).unwrap();
        assert_eq!(out.data.dtype(), Dtype::F32);
        assert_eq!(out.data.array()[[1, 1]], 1.0);
        assert_eq!(out.data.array()[[0, 0]], 0.0);
    }

    #[test]
    fn accelerated_log_accepts_negative_input() {
        let neg = Layer::create(ImageData::from_plane(array![[-0.2, 0.4]], Dtype::F32), "neg");
        let out = log(&neg, &LogParams::default(), &NoProgress).unwrap();
        assert_eq!(out.data.array()[[0, 0]], 0.0);
        let cpu = LogParams { backend: Backend::Cpu, ..Default::default() };
        assert!(matches!(log(&neg, &cpu, &NoProgress), Err(CoolToolsError::NegativeValues)));
    }

    #[test]
    fn stacks_keep_their_shape() {
        let stack = Array3::from_elem((4, 3, 3), 0.25f32);
        let layer = Layer::create(ImageData::from_stack(stack, Dtype::F32), "vol");
        let out = log(&layer, &LogParams::default(), &NoProgress).unwrap();
        assert_eq!(out.data.shape(), &[4, 3, 3]);
    }
}
