// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command entry points — one per operation.
//
// Each command copies the input layer out of the viewer and checks its rank
// on the caller's thread, then hands the copy to a background worker. When
// the worker returns, its result layer is added to the viewer.

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Layer, LayerId};
use cooltools_imgproc::ops::{
    BandPassParams, BilateralParams, ClaheParams, DenoiseParams, GammaParams, LogParams, MedianParams,
    NormalizeParams, UnsharpParams, bandpass, denoise, equalize, filters, luminance, matching, normalize,
};
use cooltools_imgproc::{Progress, validate_rank};
use tracing::{info, instrument};

use crate::viewer::Viewer;
use crate::worker::{self, WorkerHandle};

pub const BAND_PASS_LABEL: &str = "Difference of Gaussian";
pub const DENOISE_LABEL: &str = "Denoise Total Variation";
pub const CLAHE_LABEL: &str = "Autocontrast (CLAHE)";
pub const BILATERAL_LABEL: &str = "Bilateral Filter";
pub const MEDIAN_LABEL: &str = "Median Filter";
pub const UNSHARP_LABEL: &str = "Unsharp Mask";
pub const GAMMA_LABEL: &str = "Adjust gamma";
pub const LOG_LABEL: &str = "Adjust log";
pub const NORMALIZE_LABEL: &str = "Normalization";
pub const MATCH_LABEL: &str = "Histogram Matching";

/// Copy a layer out of the viewer and reject unsupported ranks up front.
fn prepare(viewer: &Viewer, id: LayerId) -> Result<Layer> {
    let layer = viewer.layer(id)?;
    validate_rank(&layer.data)?;
    Ok(layer)
}

/// Run `op` on a copy of `id` and add the layer it returns to the viewer.
fn spawn_layer_op<F>(viewer: &Viewer, id: LayerId, label: &str, op: F) -> Result<WorkerHandle<LayerId>>
where
    F: FnOnce(&Layer, &dyn Progress) -> Result<Layer> + Send + 'static,
{
    let layer = prepare(viewer, id)?;
    info!(layer = %layer.name, command = label, "command queued");
    worker::spawn(viewer, label, move |progress| op(&layer, progress), |viewer, result: Layer| {
        Ok(viewer.add_layer(result))
    })
}

// -- Filters ------------------------------------------------------------------

#[instrument(skip(viewer, params))]
pub fn diff_of_gaus(viewer: &Viewer, layer: LayerId, params: BandPassParams) -> Result<WorkerHandle<LayerId>> {
    params.validate()?;
    spawn_layer_op(viewer, layer, BAND_PASS_LABEL, move |layer, progress| {
        bandpass::apply(layer, &params, progress)
    })
}

#[instrument(skip(viewer, params))]
pub fn denoise_tv(viewer: &Viewer, layer: LayerId, params: DenoiseParams) -> Result<WorkerHandle<LayerId>> {
    spawn_layer_op(viewer, layer, DENOISE_LABEL, move |layer, progress| {
        denoise::apply(layer, &params, progress)
    })
}

#[instrument(skip(viewer, params))]
pub fn clahe(viewer: &Viewer, layer: LayerId, params: ClaheParams) -> Result<WorkerHandle<LayerId>> {
    params.validate()?;
    spawn_layer_op(viewer, layer, CLAHE_LABEL, move |layer, progress| {
        equalize::apply(layer, &params, progress)
    })
}

#[instrument(skip(viewer, params))]
pub fn filter_bilateral(viewer: &Viewer, layer: LayerId, params: BilateralParams) -> Result<WorkerHandle<LayerId>> {
    params.validate()?;
    spawn_layer_op(viewer, layer, BILATERAL_LABEL, move |layer, progress| {
        filters::bilateral(layer, &params, progress)
    })
}

#[instrument(skip(viewer, params))]
pub fn filter_median(viewer: &Viewer, layer: LayerId, params: MedianParams) -> Result<WorkerHandle<LayerId>> {
    spawn_layer_op(viewer, layer, MEDIAN_LABEL, move |layer, progress| {
        filters::median(layer, &params, progress)
    })
}

#[instrument(skip(viewer, params))]
pub fn sharpen_um(viewer: &Viewer, layer: LayerId, params: UnsharpParams) -> Result<WorkerHandle<LayerId>> {
    spawn_layer_op(viewer, layer, UNSHARP_LABEL, move |layer, progress| {
        filters::unsharp(layer, &params, progress)
    })
}

// -- Luminance ----------------------------------------------------------------

#[instrument(skip(viewer, params))]
pub fn adjust_gamma(viewer: &Viewer, layer: LayerId, params: GammaParams) -> Result<WorkerHandle<LayerId>> {
    spawn_layer_op(viewer, layer, GAMMA_LABEL, move |layer, progress| {
        luminance::gamma(layer, &params, progress)
    })
}

#[instrument(skip(viewer, params))]
pub fn adjust_log(viewer: &Viewer, layer: LayerId, params: LogParams) -> Result<WorkerHandle<LayerId>> {
    spawn_layer_op(viewer, layer, LOG_LABEL, move |layer, progress| {
        luminance::log(layer, &params, progress)
    })
}

// -- Normalization ------------------------------------------------------------

/// Normalize a layer. In place, the source is renamed `pre_norm_{name}` when
/// the worker returns and the new layer takes the original name.
#[instrument(skip(viewer, params))]
pub fn normalize_in_range(viewer: &Viewer, layer: LayerId, params: NormalizeParams) -> Result<WorkerHandle<LayerId>> {
    let source = prepare(viewer, layer)?;
    let source_id = source.id;
    worker::spawn(
        viewer,
        NORMALIZE_LABEL,
        move |progress| normalize::apply(&source, &params, progress),
        move |viewer, normalized: normalize::Normalized| {
            if let Some(name) = normalized.renamed_source {
                viewer.rename_layer(source_id, name)?;
            }
            Ok(viewer.add_layer(normalized.layer))
        },
    )
}

// -- Histogram matching -------------------------------------------------------

/// Match every selected layer except `reference` against the reference's
/// histogram. Targets are modified in place; the worker returns their ids.
#[instrument(skip(viewer))]
pub fn match_histogram(viewer: &Viewer, reference: LayerId) -> Result<WorkerHandle<Vec<LayerId>>> {
    let reference = prepare(viewer, reference)?;
    let targets = viewer
        .selected()
        .into_iter()
        .filter(|id| *id != reference.id)
        .map(|id| prepare(viewer, id))
        .collect::<Result<Vec<_>>>()?;
    if targets.is_empty() {
        return Err(CoolToolsError::EmptySelection);
    }

    let backend = viewer.config().default_backend.unwrap_or_default();
    info!(reference = %reference.name, targets = targets.len(), "histogram matching queued");
    worker::spawn(
        viewer,
        MATCH_LABEL,
        move |progress| {
            targets
                .iter()
                .map(|target| Ok((target.id, matching::apply(&target.data, &reference.data, backend, progress)?)))
                .collect::<Result<Vec<_>>>()
        },
        |viewer, matched| {
            let mut ids = Vec::with_capacity(matched.len());
            for (id, data) in matched {
                viewer.set_layer_data(id, data)?;
                ids.push(id);
            }
            Ok(ids)
        },
    )
}
