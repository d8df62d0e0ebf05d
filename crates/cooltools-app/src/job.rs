// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job files — which images to load, which commands to run on them, and
// where to write the results.

use std::path::{Path, PathBuf};

use cooltools_core::{Backend, ToolsConfig};
use cooltools_core::error::Result;
use cooltools_imgproc::ops::{
    BandPassParams, BilateralParams, ClaheParams, DenoiseParams, GammaParams, LogParams, MedianParams,
    NormalizeParams, UnsharpParams,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One path loads a single image; several load a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputPaths {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Layer name given to the loaded image.
    pub name: String,
    pub path: InputPaths,
}

/// A command applied to a layer, found by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    BandPass {
        layer: String,
        #[serde(flatten)]
        params: BandPassParams,
    },
    Denoise {
        layer: String,
        #[serde(flatten)]
        params: DenoiseParams,
    },
    Clahe {
        layer: String,
        #[serde(flatten)]
        params: ClaheParams,
    },
    Bilateral {
        layer: String,
        #[serde(flatten)]
        params: BilateralParams,
    },
    Median {
        layer: String,
        #[serde(flatten)]
        params: MedianParams,
    },
    Unsharp {
        layer: String,
        #[serde(flatten)]
        params: UnsharpParams,
    },
    Gamma {
        layer: String,
        #[serde(flatten)]
        params: GammaParams,
    },
    Log {
        layer: String,
        #[serde(flatten)]
        params: LogParams,
    },
    Normalize {
        layer: String,
        #[serde(flatten)]
        params: NormalizeParams,
    },
    MatchHistogram {
        reference: String,
        targets: Vec<String>,
    },
}

impl Step {
    /// Short name used in logs.
    pub fn op(&self) -> &'static str {
        match self {
            Self::BandPass { .. } => "band_pass",
            Self::Denoise { .. } => "denoise",
            Self::Clahe { .. } => "clahe",
            Self::Bilateral { .. } => "bilateral",
            Self::Median { .. } => "median",
            Self::Unsharp { .. } => "unsharp",
            Self::Gamma { .. } => "gamma",
            Self::Log { .. } => "log",
            Self::Normalize { .. } => "normalize",
            Self::MatchHistogram { .. } => "match_histogram",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub inputs: Vec<Input>,
    pub steps: Vec<Step>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub config: Option<ToolsConfig>,
}

impl Job {
    /// Parse a job. Steps that do not set `backend` get the embedded
    /// config's default backend, or `fallback_backend` when the job has none.
    pub fn parse(text: &str, fallback_backend: Option<Backend>) -> Result<Self> {
        let mut raw: Value = serde_json::from_str(text)?;
        let embedded = raw
            .get("config")
            .and_then(|config| config.get("default_backend"))
            .filter(|backend| !backend.is_null())
            .cloned();
        let backend = match embedded {
            Some(backend) => Some(backend),
            None => fallback_backend.map(serde_json::to_value).transpose()?,
        };

        if let (Some(backend), Some(steps)) = (backend, raw.get_mut("steps").and_then(Value::as_array_mut)) {
            for step in steps.iter_mut().filter_map(Value::as_object_mut) {
                if !step.contains_key("backend") {
                    step.insert("backend".into(), backend.clone());
                }
            }
            debug!("default backend applied to steps");
        }

        Ok(serde_json::from_value(raw)?)
    }

    pub fn load(path: impl AsRef<Path>, fallback_backend: Option<Backend>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, fallback_backend)
    }

    /// Make relative input and output paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        for input in &mut self.inputs {
            match &mut input.path {
                InputPaths::One(path) => resolve(path),
                InputPaths::Many(paths) => paths.iter_mut().for_each(resolve),
            }
        }
        resolve(&mut self.output_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"{
        "inputs": [
            {"name": "cells", "path": "cells.png"},
            {"name": "vol", "path": ["z0.png", "z1.png"]}
        ],
        "steps": [
            {"op": "band_pass", "layer": "cells", "low_sigma": 2, "high_sigma": null},
            {"op": "clahe", "layer": "vol", "kernel_size": [4, 4]},
            {"op": "normalize", "layer": "cells", "in_place": false},
            {"op": "match_histogram", "reference": "cells", "targets": ["vol"]}
        ],
        "output_dir": "out"
    }"#;

    #[test]
    fn parses_steps_with_defaults() {
        let job = Job::parse(JOB, None).unwrap();
        assert_eq!(job.inputs[1].path, InputPaths::Many(vec!["z0.png".into(), "z1.png".into()]));
        match &job.steps[0] {
            Step::BandPass { layer, params } => {
                assert_eq!(layer, "cells");
                assert_eq!(params.low_sigma, 2.0);
                assert_eq!(params.high_sigma, None);
                assert_eq!(params.truncate, 4.0);
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &job.steps[1] {
            Step::Clahe { params, .. } => {
                assert_eq!(params.kernel_size, Some((4, 4)));
                assert_eq!(params.backend, Backend::Accelerated);
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(job.steps[3].op(), "match_histogram");
        assert!(job.config.is_none());
    }

    #[test]
    fn config_backend_fills_unset_steps() {
        let text = r#"{
            "inputs": [],
            "steps": [
                {"op": "clahe", "layer": "a"},
                {"op": "log", "layer": "a", "backend": "accelerated"},
                {"op": "gamma", "layer": "a"}
            ],
            "output_dir": "out",
            "config": {"default_backend": "cpu"}
        }"#;
        let job = Job::parse(text, None).unwrap();
        assert!(matches!(&job.steps[0], Step::Clahe { params, .. } if params.backend == Backend::Cpu));
        assert!(matches!(&job.steps[1], Step::Log { params, .. } if params.backend == Backend::Accelerated));
        assert!(matches!(&job.steps[2], Step::Gamma { .. }));
    }

    #[test]
    fn fallback_backend_yields_to_embedded_config() {
        let job = Job::parse(JOB, Some(Backend::Cpu)).unwrap();
        assert!(matches!(&job.steps[1], Step::Clahe { params, .. } if params.backend == Backend::Cpu));

        let text = r#"{"inputs": [], "steps": [{"op": "log", "layer": "a"}], "output_dir": "o",
                       "config": {"default_backend": "accelerated"}}"#;
        let job = Job::parse(text, Some(Backend::Cpu)).unwrap();
        assert!(matches!(&job.steps[0], Step::Log { params, .. } if params.backend == Backend::Accelerated));
    }

    #[test]
    fn unknown_op_is_rejected() {
        let text = r#"{"inputs": [], "steps": [{"op": "sepia", "layer": "a"}], "output_dir": "o"}"#;
        assert!(Job::parse(text, None).is_err());
    }

    #[test]
    fn relative_paths_follow_the_job_file() {
        let mut job = Job::parse(JOB, None).unwrap();
        job.resolve_paths(Path::new("/data/run"));
        assert_eq!(job.inputs[0].path, InputPaths::One("/data/run/cells.png".into()));
        assert_eq!(job.output_dir, PathBuf::from("/data/run/out"));
    }
}
