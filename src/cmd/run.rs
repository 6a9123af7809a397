//! The `run` subcommand: execute one import run.

use std::path::PathBuf;

use clap::Args;

use crate::common::*;
use crate::config::{EnvFile, RunConfig};
use crate::pipeline;
use crate::report::Reporter;

#[derive(Debug, Args)]
pub(crate) struct Opt {
    /// Path to the KEY=VALUE configuration file loaded into the
    /// environment at startup.
    #[arg(long = "env-file", default_value = ".env")]
    env_file: PathBuf,

    /// Let file values replace variables already set in the environment.
    #[arg(long = "override-env")]
    override_env: bool,
}

pub(crate) async fn run(opt: Opt) -> Result<()> {
    if opt.env_file.exists() {
        EnvFile::load(&opt.env_file)?.apply_to_env(opt.override_env);
        info!("loaded configuration from {}", opt.env_file.display());
    }

    let (reporter, mut receiver) = Reporter::new();
    let printer = tokio::spawn(async move {
        while let Some(line) = receiver.recv().await {
            println!("{}", line);
        }
    });

    let result = match RunConfig::from_env() {
        Ok(config) => pipeline::run(config, reporter).await,
        Err(err) => {
            reporter.report(format!("{:#}", err));
            drop(reporter);
            Err(err)
        }
    };

    // The pipeline has dropped its reporter; drain whatever is left.
    let _ = printer.await;
    result
}
