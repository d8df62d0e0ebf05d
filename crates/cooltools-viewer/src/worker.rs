// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-use background workers.
//
// A worker runs one task on its own thread and reports over an mpsc channel:
// `Started`, any number of `Progress` events, then `Returned` or `Errored`,
// and always `Finished` last. The caller polls the channel or joins.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_imgproc::Progress;
use tracing::{debug, instrument};

use crate::viewer::Viewer;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Started,
    Progress { desc: String, done: usize, total: usize },
    /// The task finished and its result was handed to the viewer.
    Returned,
    Errored(String),
    Finished,
}

struct ChannelProgress {
    tx: Sender<WorkerEvent>,
    enabled: bool,
}

impl Progress for ChannelProgress {
    fn advance(&self, desc: &str, done: usize, total: usize) {
        if self.enabled {
            let _ = self.tx.send(WorkerEvent::Progress {
                desc: desc.to_string(),
                done,
                total,
            });
        }
    }
}

/// Handle to a running worker.
pub struct WorkerHandle<T> {
    label: String,
    events: Receiver<WorkerEvent>,
    thread: JoinHandle<Result<T>>,
}

impl<T> WorkerHandle<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Every event posted since the last poll, without blocking.
    pub fn poll(&self) -> Vec<WorkerEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker ends and return what `on_returned` produced.
    pub fn join(self) -> Result<T> {
        self.thread
            .join()
            .map_err(|payload| CoolToolsError::Worker(format!("{} worker panicked: {}", self.label, panic_message(&*payload))))?
    }

    /// Block until the worker ends, returning its result and every event it
    /// posted.
    pub fn join_with_events(self) -> (Result<T>, Vec<WorkerEvent>) {
        let WorkerHandle { label, events, thread } = self;
        let result = thread
            .join()
            .map_err(|payload| CoolToolsError::Worker(format!("{label} worker panicked: {}", panic_message(&*payload))))
            .and_then(|inner| inner);
        (result, events.try_iter().collect())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `task` on a new thread.
///
/// Posts "`label` thread has started" before the task and "`label` thread
/// has completed" once `on_returned` has accepted the result. A failing or
/// panicking task is posted as an error notification and surfaces from
/// [`WorkerHandle::join`].
#[instrument(skip_all, fields(label = %label))]
pub fn spawn<T, O, F, R>(viewer: &Viewer, label: &str, task: F, on_returned: R) -> Result<WorkerHandle<O>>
where
    T: Send + 'static,
    O: Send + 'static,
    F: FnOnce(&dyn Progress) -> Result<T> + Send + 'static,
    R: FnOnce(&Viewer, T) -> Result<O> + Send + 'static,
{
    let (tx, rx) = channel();
    let viewer = viewer.clone();
    let name = label.to_string();

    let thread = thread::Builder::new()
        .name(format!("cooltools-{}", name.to_lowercase().replace(' ', "-")))
        .spawn(move || {
            let _ = tx.send(WorkerEvent::Started);
            viewer.notifications().show_info(format!("{name} thread has started"));

            let progress = ChannelProgress {
                tx: tx.clone(),
                enabled: viewer.config().report_progress,
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(&progress)))
                .unwrap_or_else(|payload| Err(CoolToolsError::Worker(panic_message(&*payload))))
                .and_then(|value| on_returned(&viewer, value));

            match &outcome {
                Ok(_) => {
                    let _ = tx.send(WorkerEvent::Returned);
                    viewer.notifications().show_info(format!("{name} thread has completed"));
                }
                Err(err) => {
                    let _ = tx.send(WorkerEvent::Errored(err.to_string()));
                    viewer.notifications().show_error(format!("{name} failed: {err}"));
                }
            }
            let _ = tx.send(WorkerEvent::Finished);
            debug!(worker = %name, ok = outcome.is_ok(), "worker finished");
            outcome
        })?;

    Ok(WorkerHandle {
        label: label.to_string(),
        events: rx,
        thread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;

    #[test]
    fn successful_task_posts_full_lifecycle() {
        let viewer = Viewer::default();
        let handle = spawn(&viewer, "Sum", |progress| {
            progress.advance("Sum", 1, 2);
            progress.advance("Sum", 2, 2);
            Ok(3)
        }, |_, value: i32| Ok(value * 2))
        .unwrap();

        let (result, events) = handle.join_with_events();
        assert_eq!(result.unwrap(), 6);
        assert_eq!(events.first(), Some(&WorkerEvent::Started));
        assert_eq!(events.iter().filter(|e| matches!(e, WorkerEvent::Progress { .. })).count(), 2);
        assert_eq!(&events[events.len() - 2..], &[WorkerEvent::Returned, WorkerEvent::Finished]);

        let messages: Vec<_> = viewer.notifications().all().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Sum thread has started", "Sum thread has completed"]);
    }

    #[test]
    fn failing_task_is_reported() {
        let viewer = Viewer::default();
        let handle = spawn(&viewer, "Broken", |_| -> Result<()> { Err(CoolToolsError::NegativeValues) }, |_, v| Ok(v))
            .unwrap();
        let (result, events) = handle.join_with_events();
        assert!(matches!(result, Err(CoolToolsError::NegativeValues)));
        assert!(events.iter().any(|e| matches!(e, WorkerEvent::Errored(_))));
        assert_eq!(events.last(), Some(&WorkerEvent::Finished));
        assert_eq!(viewer.notifications().all().last().map(|n| n.level), Some(Level::Error));
    }

    #[test]
    fn panicking_task_becomes_worker_error() {
        let viewer = Viewer::default();
        let handle = spawn(&viewer, "Panics", |_| -> Result<()> { panic!("boom") }, |_, v| Ok(v)).unwrap();
        match handle.join() {
            Err(CoolToolsError::Worker(message)) => assert!(message.contains("boom")),
            other => panic!("expected worker error, got {other:?}"),
        }
    }

    #[test]
    fn progress_can_be_switched_off() {
        let config = cooltools_core::ToolsConfig { report_progress: false, ..Default::default() };
        let viewer = Viewer::new(config);
        let handle = spawn(&viewer, "Quiet", |progress| {
            progress.advance("Quiet", 1, 1);
            Ok(())
        }, |_, v| Ok(v))
        .unwrap();
        let (_, events) = handle.join_with_events();
        assert!(!events.iter().any(|e| matches!(e, WorkerEvent::Progress { .. })));
    }

    #[test]
    fn poll_drains_events_after_finish() {
        let viewer = Viewer::default();
        let handle = spawn(&viewer, "Poll", |_| Ok(()), |_, v| Ok(v)).unwrap();
        while !handle.is_finished() {
            std::thread::yield_now();
        }
        let events = handle.poll();
        assert_eq!(events.last(), Some(&WorkerEvent::Finished));
        assert!(handle.poll().is_empty());
        handle.join().unwrap();
    }
}
