// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job runner — loads the inputs into a viewer, runs each step as a command,
// waits for its worker, and writes every layer the steps produced.

use std::path::PathBuf;

use cooltools_core::error::Result;
use cooltools_core::{Layer, LayerId, ToolsConfig};
use cooltools_imgproc::io::{load_image, load_stack, save_layer};
use cooltools_viewer::commands;
use cooltools_viewer::{Notification, Viewer, WorkerEvent, WorkerHandle};
use tracing::{debug, info, instrument};

use crate::job::{InputPaths, Job, Step};

/// What a finished job produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Names of the layers written, in the order they were produced.
    pub layers: Vec<String>,
    pub written: Vec<PathBuf>,
    /// Start, finish and error notifications posted while the steps ran.
    pub notifications: Vec<Notification>,
}

/// Run `job` to completion. Steps run one after another; each waits for its
/// worker before the next one starts.
#[instrument(skip_all, fields(inputs = job.inputs.len(), steps = job.steps.len()))]
pub fn run(job: &Job, fallback_config: ToolsConfig) -> Result<RunReport> {
    let config = job.config.clone().unwrap_or(fallback_config);
    let output_format = config.output_format;
    let viewer = Viewer::new(config);

    for input in &job.inputs {
        let data = match &input.path {
            InputPaths::One(path) => load_image(path)?,
            InputPaths::Many(paths) => load_stack(paths)?,
        };
        viewer.add_layer(Layer::create(data, input.name.clone()));
    }

    let mut produced: Vec<LayerId> = Vec::new();
    for (index, step) in job.steps.iter().enumerate() {
        info!(step = index, op = step.op(), "running step");
        for id in run_step(&viewer, step)? {
            if !produced.contains(&id) {
                produced.push(id);
            }
        }
    }

    let mut report = RunReport::default();
    for id in produced {
        let layer = viewer.layer(id)?;
        report.written.extend(save_layer(&layer, &job.output_dir, output_format)?);
        report.layers.push(layer.name);
    }
    report.notifications = viewer.notifications().drain();
    info!(files = report.written.len(), notifications = report.notifications.len(), "job complete");
    Ok(report)
}

fn run_step(viewer: &Viewer, step: &Step) -> Result<Vec<LayerId>> {
    let find = |name: &str| viewer.layer_by_name(name).map(|layer| layer.id);
    let single = |handle: WorkerHandle<LayerId>| finish(handle).map(|id| vec![id]);

    match step {
        Step::BandPass { layer, params } => single(commands::diff_of_gaus(viewer, find(layer)?, params.clone())?),
        Step::Denoise { layer, params } => single(commands::denoise_tv(viewer, find(layer)?, params.clone())?),
        Step::Clahe { layer, params } => single(commands::clahe(viewer, find(layer)?, params.clone())?),
        Step::Bilateral { layer, params } => {
            single(commands::filter_bilateral(viewer, find(layer)?, params.clone())?)
        }
        Step::Median { layer, params } => single(commands::filter_median(viewer, find(layer)?, params.clone())?),
        Step::Unsharp { layer, params } => single(commands::sharpen_um(viewer, find(layer)?, params.clone())?),
        Step::Gamma { layer, params } => single(commands::adjust_gamma(viewer, find(layer)?, params.clone())?),
        Step::Log { layer, params } => single(commands::adjust_log(viewer, find(layer)?, params.clone())?),
        Step::Normalize { layer, params } => {
            single(commands::normalize_in_range(viewer, find(layer)?, params.clone())?)
        }
        Step::MatchHistogram { reference, targets } => {
            viewer.clear_selection();
            for target in targets {
                viewer.select(find(target)?)?;
            }
            finish(commands::match_histogram(viewer, find(reference)?)?)
        }
    }
}

/// Wait for a worker and log the events it posted.
fn finish<T>(handle: WorkerHandle<T>) -> Result<T> {
    let label = handle.label().to_string();
    let (result, events) = handle.join_with_events();
    for event in events {
        match event {
            WorkerEvent::Progress { desc, done, total } => debug!(worker = %label, %desc, done, total, "progress"),
            other => debug!(worker = %label, event = ?other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooltools_core::{Dtype, ImageData, OutputFormat};
    use cooltools_imgproc::ops::{BandPassParams, GammaParams, NormalizeParams};
    use ndarray::Array2;
    use std::path::Path;

    fn write_input(dir: &Path, name: &str, offset: f32) {
        let plane = Array2::from_shape_fn((12, 12), |(r, c)| offset + (r * 12 + c) as f32);
        let layer = Layer::create(ImageData::from_plane(plane, Dtype::U8), name);
        save_layer(&layer, dir, OutputFormat::Png).unwrap();
    }

    #[test]
    fn runs_steps_and_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        write_input(dir.path(), "cells", 0.0);
        let job = Job {
            inputs: vec![crate::job::Input {
                name: "cells".into(),
                path: InputPaths::One(dir.path().join("cells.png")),
            }],
            steps: vec![
                Step::BandPass { layer: "cells".into(), params: BandPassParams { high_sigma: Some(3.0), ..Default::default() } },
                Step::Gamma { layer: "cells".into(), params: GammaParams { gamma: 0.5, gain: 1.0 } },
                Step::Normalize { layer: "cells_LC".into(), params: NormalizeParams { in_place: false, ..Default::default() } },
            ],
            output_dir: dir.path().join("out"),
            config: None,
        };

        let report = run(&job, ToolsConfig::default()).unwrap();
        assert_eq!(report.layers, vec!["cells_Band-pass", "cells_LC", "cells_LC_norm_0.0_1.0"]);
        let messages: Vec<_> = report.notifications.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0], "Difference of Gaussian thread has started");
        assert_eq!(messages[5], "Normalization thread has completed");
        for name in ["cells_Band-pass.png", "cells_LC.png", "cells_LC_norm_0.0_1.0.png"] {
            assert!(dir.path().join("out").join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn stack_input_is_written_per_slice() {
        let dir = tempfile::tempdir().unwrap();
        write_input(dir.path(), "z0", 0.0);
        write_input(dir.path(), "z1", 50.0);
        let job = Job::parse(&format!(
            r#"{{
                "inputs": [{{"name": "vol", "path": ["{0}/z0.png", "{0}/z1.png"]}}],
                "steps": [{{"op": "median", "layer": "vol"}}],
                "output_dir": "{0}/out"
            }}"#,
            dir.path().display()
        ), None)
        .unwrap();
        let report = run(&job, ToolsConfig::default()).unwrap();
        assert_eq!(report.layers, vec!["vol_Median"]);
        assert_eq!(report.written.len(), 2);
        assert!(report.written[1].ends_with("vol_Median_001.png"));
    }

    #[test]
    fn histogram_step_rewrites_targets() {
        let dir = tempfile::tempdir().unwrap();
        write_input(dir.path(), "a", 0.0);
        write_input(dir.path(), "b", 100.0);
        let job = Job {
            inputs: vec![
                crate::job::Input { name: "a".into(), path: InputPaths::One(dir.path().join("a.png")) },
                crate::job::Input { name: "b".into(), path: InputPaths::One(dir.path().join("b.png")) },
            ],
            steps: vec![Step::MatchHistogram { reference: "a".into(), targets: vec!["b".into()] }],
            output_dir: dir.path().join("out"),
            config: None,
        };
        let report = run(&job, ToolsConfig::default()).unwrap();
        assert_eq!(report.layers, vec!["b"]);
        let matched = load_image(&report.written[0]).unwrap();
        assert_eq!(matched.min_max(), Some((0.0, 143.0)));
    }

    #[test]
    fn missing_layer_stops_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job {
            inputs: vec![],
            steps: vec![Step::Gamma { layer: "ghost".into(), params: GammaParams::default() }],
            output_dir: dir.path().join("out"),
            config: None,
        };
        assert!(run(&job, ToolsConfig::default()).is_err());
    }
}
