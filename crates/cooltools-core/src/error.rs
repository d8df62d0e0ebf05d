// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for cooltools.

use thiserror::Error;

/// Top-level error type for all cooltools operations.
#[derive(Debug, Error)]
pub enum CoolToolsError {
    // -- Input validation --
    #[error("only works for data of 2 or 3 dimensions (got {ndim})")]
    InvalidRank { ndim: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("image correction methods work correctly only on images with non-negative values")]
    NegativeValues,

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    // -- Viewer --
    #[error("layer not found: {0}")]
    LayerNotFound(String),

    #[error("no layers selected")]
    EmptySelection,

    #[error("worker failed: {0}")]
    Worker(String),

    // -- Files --
    #[error("image I/O failed: {0}")]
    ImageError(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoolToolsError>;
