// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// cooltools-imgproc — Image-processing operations for single images and
// image stacks.
//
// Provides the numerical kernels (Gaussian filtering, total-variation
// denoising, CLAHE, bilateral blur, median filtering, luminance curves,
// histogram matching), the 2D/3D plane dispatch that applies a kernel to every
// slice of a stack, one module per user-facing operation, and image file I/O.

pub mod io;
pub mod kernels;
pub mod ops;
pub mod progress;
pub mod stack;

pub use progress::{NoProgress, Progress};
pub use stack::{Execution, map_planes, validate_rank};
