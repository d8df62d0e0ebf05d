// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spatial filters: bilateral blur, repeated median, and unsharp masking.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Backend, Dtype, ImageData, Layer};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{derived_layer, require_non_negative, require_positive};
use crate::kernels::bilateral::bilateral_blur;
use crate::kernels::exposure::unsharp_mask;
use crate::kernels::rank::median_filter;
use crate::progress::Progress;
use crate::stack::{Execution, map_planes, validate_rank};

pub const BILATERAL_SUFFIX: &str = "_Bilat";
pub const BILATERAL_LABEL: &str = "Bilateral Blur";
pub const MEDIAN_SUFFIX: &str = "_Median";
pub const MEDIAN_LABEL: &str = "Median";
pub const UNSHARP_SUFFIX: &str = "_Sharp";
pub const UNSHARP_LABEL: &str = "Unsharp Mask";

// -- Bilateral ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilateralParams {
    /// Side of the square window. Must be odd.
    pub disk_size: usize,
    pub sigma_color: f32,
    /// Spatial sigma along rows and along columns.
    pub sigma_space: (f32, f32),
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            disk_size: 3,
            sigma_color: 0.1,
            sigma_space: (10.0, 10.0),
        }
    }
}

impl BilateralParams {
    pub fn validate(&self) -> Result<()> {
        if self.disk_size == 0 || self.disk_size % 2 == 0 {
            return Err(CoolToolsError::InvalidParameter(format!(
                "disk_size must be a positive odd number (got {})",
                self.disk_size
            )));
        }
        require_positive("sigma_color", self.sigma_color)?;
        require_positive("sigma_space.0", self.sigma_space.0)?;
        require_positive("sigma_space.1", self.sigma_space.1)
    }
}

/// Bilateral blur on unit floats. Slices always run on the parallel path.
#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), disk_size = params.disk_size))]
pub fn bilateral(layer: &Layer, params: &BilateralParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    params.validate()?;
    info!("bilateral blur started");

    let window = (params.disk_size, params.disk_size);
    let unit = layer.data.to_unit_float();
    let blurred = map_planes(&unit, BILATERAL_LABEL, Execution::Parallel, progress, |plane| {
        Ok(bilateral_blur(plane, window, params.sigma_color, params.sigma_space))
    })?;

    info!("bilateral blur complete");
    Ok(derived_layer(layer, ImageData::new(blurred, Dtype::F32), BILATERAL_SUFFIX, "bilateral"))
}

// -- Median -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedianParams {
    /// Radius of the disk footprint.
    pub disk_size: usize,
    /// How many times the filter is applied in a row.
    pub applications: usize,
    pub backend: Backend,
}

impl Default for MedianParams {
    fn default() -> Self {
        Self {
            disk_size: 1,
            applications: 1,
            backend: Backend::Cpu,
        }
    }
}

/// Median filter, repeated `applications` times. Keeps the input dtype.
#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), disk_size = params.disk_size))]
pub fn median(layer: &Layer, params: &MedianParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    if params.applications == 0 {
        return Err(CoolToolsError::InvalidParameter("applications must be at least 1".into()));
    }
    info!(applications = params.applications, "median filter started");

    let filtered = map_planes(layer.data.array(), MEDIAN_LABEL, params.backend.into(), progress, |plane| {
        let mut current = median_filter(plane, params.disk_size);
        for pass in 1..params.applications {
            debug!(pass, "median pass");
            current = median_filter(current.view(), params.disk_size);
        }
        Ok(current)
    })?;

    info!("median filter complete");
    let output = ImageData::new(filtered, layer.data.dtype());
    Ok(derived_layer(layer, output, MEDIAN_SUFFIX, "median"))
}

// -- Unsharp mask -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsharpParams {
    pub radius: f32,
    pub amount: f32,
    /// Work on raw values instead of unit floats, without clipping.
    pub preserve_range: bool,
    pub backend: Backend,
}

impl Default for UnsharpParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            amount: 1.0,
            preserve_range: false,
            backend: Backend::Cpu,
        }
    }
}

/// Clip window for unit-float output: signed inputs keep their negative half.
fn unit_clip_range(unit: &ArrayD<f32>) -> (f32, f32) {
    if unit.iter().any(|&v| v < 0.0) {
        (-1.0, 1.0)
    } else {
        (0.0, 1.0)
    }
}

#[instrument(skip_all, fields(layer = %layer.name, shape = ?layer.data.shape(), radius = params.radius, amount = params.amount))]
pub fn unsharp(layer: &Layer, params: &UnsharpParams, progress: &dyn Progress) -> Result<Layer> {
    validate_rank(&layer.data)?;
    require_non_negative("radius", params.radius)?;
    if !params.amount.is_finite() {
        return Err(CoolToolsError::InvalidParameter(format!(
            "amount must be finite (got {})",
            params.amount
        )));
    }
    info!("unsharp mask started");

    let (input, clip) = if params.preserve_range {
        (layer.data.array().clone(), None)
    } else {
        let unit = layer.data.to_unit_float();
        let clip = unit_clip_range(&unit);
        (unit, Some(clip))
    };
    let sharpened = map_planes(&input, UNSHARP_LABEL, params.backend.into(), progress, |plane| {
        Ok(unsharp_mask(plane, params.radius, params.amount, clip))
    })?;

    info!("unsharp mask complete");
    Ok(derived_layer(layer, ImageData::new(sharpened, Dtype::F32), UNSHARP_SUFFIX, "unsharp_mask"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use ndarray::{Array, Array2, Array3, IxDyn};

    fn step() -> Array2<f32> {
        Array2::from_shape_fn((8, 8), |(_, c)| if c < 4 { 50.0 } else { 200.0 })
    }

    #[test]
    fn bilateral_names_and_types_output() {
        let layer = Layer::create(ImageData::from_plane(step(), Dtype::U8), "edges");
        let out = bilateral(&layer, &BilateralParams::default(), &NoProgress).unwrap();
        assert_eq!(out.name, "edges_Bilat");
        assert_eq!(out.data.dtype(), Dtype::F32);
        assert!((out.data.array()[[4, 0]] - 50.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn bilateral_rejects_even_window() {
        let layer = Layer::create(ImageData::from_plane(step(), Dtype::U8), "edges");
        let params = BilateralParams { disk_size: 4, ..Default::default() };
        assert!(matches!(bilateral(&layer, &params, &NoProgress), Err(CoolToolsError::InvalidParameter(_))));
    }

    #[test]
    fn median_removes_salt_and_keeps_dtype() {
        let mut plane = Array2::from_elem((7, 7), 10.0f32);
        plane[[3, 3]] = 255.0;
        let layer = Layer::create(ImageData::from_plane(plane, Dtype::U8), "speckle");
        let params = MedianParams { applications: 2, ..Default::default() };
        let out = median(&layer, &params, &NoProgress).unwrap();
        assert_eq!(out.name, "speckle_Median");
        assert_eq!(out.data.dtype(), Dtype::U8);
        assert_eq!(out.data.array()[[3, 3]], 10.0);
    }

    #[test]
    fn median_needs_an_application() {
        let layer = Layer::create(ImageData::from_plane(step(), Dtype::U8), "edges");
        let params = MedianParams { applications: 0, ..Default::default() };
        assert!(median(&layer, &params, &NoProgress).is_err());
    }

    #[test]
    fn unsharp_clips_unit_output() {
        let layer = Layer::create(ImageData::from_plane(step(), Dtype::U8), "edges");
        let out = unsharp(&layer, &UnsharpParams { amount: 3.0, ..Default::default() }, &NoProgress).unwrap();
        assert_eq!(out.name, "edges_Sharp");
        assert!(out.data.array().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(out.data.array()[[4, 4]] > 200.0 / 255.0);
    }

    #[test]
    fn unsharp_keeps_negative_half_of_signed_input() {
        let plane = Array2::from_shape_fn((8, 8), |(r, _)| if r < 4 { 0.4 } else { -0.4 });
        let layer = Layer::create(ImageData::from_plane(plane, Dtype::F32), "dog");
        let out = unsharp(&layer, &UnsharpParams::default(), &NoProgress).unwrap();
        let data = out.data.array();
        assert!(data[[4, 0]] < -0.4);
        assert!(data[[7, 7]] < 0.0);
        assert!(data.iter().all(|&v| (-1.0..=1.0).contains(&v)));
    }

    #[test]
    fn unsharp_clips_signed_input_to_symmetric_range() {
        let plane = Array2::from_shape_fn((8, 8), |(_, c)| if c < 4 { -0.9 } else { 0.9 });
        let layer = Layer::create(ImageData::from_plane(plane, Dtype::F32), "dog");
        let params = UnsharpParams { amount: 5.0, ..Default::default() };
        let out = unsharp(&layer, &params, &NoProgress).unwrap();
        assert_eq!(out.data.array()[[0, 3]], -1.0);
        assert_eq!(out.data.array()[[0, 4]], 1.0);
    }

    #[test]
    fn unsharp_preserve_range_keeps_raw_scale() {
        let layer = Layer::create(ImageData::from_plane(step(), Dtype::U8), "edges");
        let params = UnsharpParams { preserve_range: true, ..Default::default() };
        let out = unsharp(&layer, &params, &NoProgress).unwrap();
        assert!(out.data.array()[[4, 4]] > 200.0);
        assert!(out.data.array()[[4, 3]] < 50.0);
    }

    #[test]
    fn filters_run_per_slice_and_reject_bad_ranks() {
        let stack = Array3::from_shape_fn((2, 6, 6), |(s, _, _)| s as f32 * 0.5);
        let layer = Layer::create(ImageData::from_stack(stack, Dtype::F32), "vol");
        let out = median(&layer, &MedianParams::default(), &NoProgress).unwrap();
        assert_eq!(out.data.array()[[1, 2, 2]], 0.5);

        let flat = Layer::create(ImageData::new(Array::zeros(IxDyn(&[6])), Dtype::F32), "line");
        assert!(matches!(
            bilateral(&flat, &BilateralParams::default(), &NoProgress),
            Err(CoolToolsError::InvalidRank { ndim: 1 })
        ));
    }
}
