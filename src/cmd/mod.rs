//! Command parsing.

use clap::{Parser, Subcommand};

use crate::common::*;

pub(crate) mod config;
pub(crate) mod run;

/// Command-line options.
#[derive(Debug, Parser)]
#[command(
    name = "spectrum-import",
    about = "Import staged S3 datasets into Redshift Spectrum.",
    version
)]
pub(crate) struct Opt {
    /// The command to run.
    #[command(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run the import pipeline.
    Run {
        #[command(flatten)]
        command: run::Opt,
    },

    /// Update the persisted configuration file.
    Config {
        #[command(flatten)]
        command: config::Opt,
    },
}

pub(crate) async fn run(opt: Opt) -> Result<()> {
    match opt.cmd {
        Command::Run { command } => run::run(command).await,
        Command::Config { command } => config::run(command),
    }
}
