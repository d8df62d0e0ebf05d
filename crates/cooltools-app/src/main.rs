// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// cooltools — headless batch runner.
//
// Loads the job's input images into a viewer, runs each step as a background
// command, and writes the produced layers to the job's output directory.

mod job;
mod runner;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use cooltools_core::ToolsConfig;
use cooltools_core::error::Result;
use cooltools_viewer::Level;

use job::Job;

#[derive(Debug, Parser)]
#[command(name = "cooltools")]
#[command(about = "Run a JSON job of image-processing steps over images and stacks")]
#[command(version)]
struct Cli {
    /// Path to the job description (JSON).
    job: PathBuf,

    /// Optional tool configuration (JSON). Its default backend applies to
    /// steps that do not name one.
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(job = %cli.job.display(), "cooltools starting");

    match run_job_file(&cli.job, cli.config.as_deref()) {
        Ok(report) => {
            let failures = report.notifications.iter().filter(|n| n.level == Level::Error).count();
            tracing::info!(layers = ?report.layers, failures, "layers written");
            for path in &report.written {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "job failed");
            eprintln!("cooltools: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_job_file(job_path: &Path, config_path: Option<&Path>) -> Result<runner::RunReport> {
    let config = match config_path {
        Some(path) => ToolsConfig::load(path)?,
        None => ToolsConfig::default(),
    };
    let mut job = Job::load(job_path, config.default_backend)?;
    if let Some(base) = job_path.parent() {
        job.resolve_paths(base);
    }
    runner::run(&job, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_path_is_optional() {
        let cli = Cli::try_parse_from(["cooltools", "job.json"]).unwrap();
        assert_eq!(cli.job, PathBuf::from("job.json"));
        assert!(cli.config.is_none());

        let cli = Cli::try_parse_from(["cooltools", "job.json", "tools.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("tools.json")));
    }

    #[test]
    fn help_is_not_mistaken_for_a_job() {
        let err = Cli::try_parse_from(["cooltools", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn missing_job_is_a_usage_error() {
        let err = Cli::try_parse_from(["cooltools"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
