//! The `config` subcommand: update the persisted `KEY=VALUE` file.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::common::*;
use crate::config::EnvFile;

#[derive(Debug, Args)]
pub(crate) struct Opt {
    /// Path to the KEY=VALUE configuration file.
    #[arg(long = "env-file", default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    cmd: ConfigCommand,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Set a configuration key.
    Set { key: String, value: String },

    /// Remove a configuration key.
    Unset { key: String },

    /// Print the configuration file path.
    Path,
}

pub(crate) fn run(opt: Opt) -> Result<()> {
    match opt.cmd {
        ConfigCommand::Set { key, value } => {
            let mut env_file = EnvFile::load(&opt.env_file)?;
            env_file.set(&key, &value);
            env_file.store(&opt.env_file)
        }
        ConfigCommand::Unset { key } => {
            let mut env_file = EnvFile::load(&opt.env_file)?;
            if !env_file.unset(&key) {
                warn!("key {:?} was not set", key);
            }
            env_file.store(&opt.env_file)
        }
        ConfigCommand::Path => {
            println!("{}", opt.env_file.display());
            Ok(())
        }
    }
}
