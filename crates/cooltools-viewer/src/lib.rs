// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// cooltools-viewer — Host model for the image-processing commands.
//
// Holds the layer list and selection, collects user-facing notifications, and
// runs every command on a single-use background worker that adds its result
// to the viewer when it returns.

pub mod commands;
pub mod notify;
pub mod viewer;
pub mod worker;

pub use notify::{Level, Notification, Notifications};
pub use viewer::Viewer;
pub use worker::{WorkerEvent, WorkerHandle};
