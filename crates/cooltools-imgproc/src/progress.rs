// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-slice progress reporting.

/// Receives a tick every time a plane of a stack has been processed.
///
/// Implementations must tolerate calls from several threads at once: the
/// accelerated backend processes slices on the rayon pool.
pub trait Progress: Send + Sync {
    /// `done` of `total` planes finished for the step labelled `desc`.
    fn advance(&self, desc: &str, done: usize, total: usize);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&self, _desc: &str, _done: usize, _total: usize) {}
}
