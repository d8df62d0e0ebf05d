// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 2D/3D dispatch — apply a plane transform to a single image or to every
// slice of a stack along axis 0.

use std::sync::atomic::{AtomicUsize, Ordering};

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Backend, ImageData};
use ndarray::{Array2, Array3, ArrayD, ArrayView2, Axis, Ix2, Ix3};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::progress::Progress;

/// How the slices of a stack are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// One slice after another on the calling thread.
    Sequential,
    /// Slices spread across the rayon pool.
    Parallel,
}

impl From<Backend> for Execution {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Cpu => Self::Sequential,
            Backend::Accelerated => Self::Parallel,
        }
    }
}

/// Reject buffers that are neither a single image nor a stack.
pub fn validate_rank(data: &ImageData) -> Result<()> {
    match data.ndim() {
        2 | 3 => Ok(()),
        ndim => Err(CoolToolsError::InvalidRank { ndim }),
    }
}

/// Apply `transform` to every 2D plane of `input`.
///
/// A rank-2 input is handed to `transform` exactly once. A rank-3 input
/// `(N, H, W)` is handed over slice by slice, `N` calls in total, and the
/// results are written into an output of the same shape. Each call must
/// return an array with the shape of the plane it received.
#[instrument(skip_all, fields(desc = %desc, shape = ?input.shape(), ?execution))]
pub fn map_planes<F>(
    input: &ArrayD<f32>,
    desc: &str,
    execution: Execution,
    progress: &dyn Progress,
    transform: F,
) -> Result<ArrayD<f32>>
where
    F: Fn(ArrayView2<'_, f32>) -> Result<Array2<f32>> + Sync,
{
    match input.ndim() {
        2 => {
            let plane = input
                .view()
                .into_dimensionality::<Ix2>()
                .map_err(|_| CoolToolsError::InvalidRank { ndim: input.ndim() })?;
            let output = transform(plane)?;
            check_plane_shape(plane.dim(), &output)?;
            progress.advance(desc, 1, 1);
            Ok(output.into_dyn())
        }
        3 => {
            let stack = input
                .view()
                .into_dimensionality::<Ix3>()
                .map_err(|_| CoolToolsError::InvalidRank { ndim: input.ndim() })?;
            let total = stack.len_of(Axis(0));
            let mut output = Array3::<f32>::zeros(stack.raw_dim());
            debug!(total, "processing stack slices");

            match execution {
                Execution::Sequential => {
                    for (index, slice) in stack.axis_iter(Axis(0)).enumerate() {
                        let plane = transform(slice)?;
                        check_plane_shape(slice.dim(), &plane)?;
                        output.index_axis_mut(Axis(0), index).assign(&plane);
                        progress.advance(desc, index + 1, total);
                    }
                }
                Execution::Parallel => {
                    let done = AtomicUsize::new(0);
                    let planes = (0..total)
                        .into_par_iter()
                        .map(|index| {
                            let slice = stack.index_axis(Axis(0), index);
                            let plane = transform(slice)?;
                            check_plane_shape(slice.dim(), &plane)?;
                            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                            progress.advance(desc, finished, total);
                            Ok(plane)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    for (index, plane) in planes.iter().enumerate() {
                        output.index_axis_mut(Axis(0), index).assign(plane);
                    }
                }
            }

            Ok(output.into_dyn())
        }
        ndim => Err(CoolToolsError::InvalidRank { ndim }),
    }
}

fn check_plane_shape(expected: (usize, usize), plane: &Array2<f32>) -> Result<()> {
    if plane.dim() != expected {
        return Err(CoolToolsError::ShapeMismatch {
            expected: vec![expected.0, expected.1],
            actual: plane.shape().to_vec(),
        });
    }
    Ok(())
}
