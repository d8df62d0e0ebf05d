// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-facing operations. Each module validates its input layer, runs one
// kernel over every plane, and returns a new layer named after the source.

pub mod bandpass;
pub mod denoise;
pub mod equalize;
pub mod filters;
pub mod luminance;
pub mod matching;
pub mod normalize;

use cooltools_core::{ImageData, Layer};

pub use bandpass::BandPassParams;
pub use denoise::DenoiseParams;
pub use equalize::ClaheParams;
pub use filters::{BilateralParams, MedianParams, UnsharpParams};
pub use luminance::{GammaParams, LogParams};
pub use normalize::{NormalizeParams, Normalized};

/// Wrap `data` in a layer named `{source}{suffix}`, tagged with the
/// operation that produced it.
pub(crate) fn derived_layer(source: &Layer, data: ImageData, suffix: &str, operation: &str) -> Layer {
    Layer::create(data, source.derived_name(suffix))
        .with_metadata("operation", operation)
        .with_metadata("source", source.name.clone())
}

/// Reject NaN, infinite, or negative values for a named parameter.
pub(crate) fn require_non_negative(name: &str, value: f32) -> cooltools_core::Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(cooltools_core::CoolToolsError::InvalidParameter(format!(
            "{name} must be a finite non-negative number (got {value})"
        )));
    }
    Ok(())
}

/// Reject NaN, infinite, zero, or negative values for a named parameter.
pub(crate) fn require_positive(name: &str, value: f32) -> cooltools_core::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(cooltools_core::CoolToolsError::InvalidParameter(format!(
            "{name} must be a finite positive number (got {value})"
        )));
    }
    Ok(())
}
