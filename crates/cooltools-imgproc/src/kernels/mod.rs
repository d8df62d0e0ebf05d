// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Numerical kernels. Each works on a single 2D plane; the ops layer decides
// how planes are fed to them.

pub mod bilateral;
pub mod clahe;
pub mod exposure;
pub mod gaussian;
pub mod histogram;
pub mod rank;
pub mod tv;

pub use gaussian::BoundaryMode;
