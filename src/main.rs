//! Import staged S3 datasets into Redshift Spectrum external schemas.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod clouds;
mod cmd;
#[allow(unused_imports)]
mod common;
mod config;
mod discovery;
mod location;
mod pipeline;
mod report;
mod tls;
mod warehouse;

use crate::common::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr so stdout stays clean for run reports.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opt = cmd::Opt::parse();
    debug!("{:?}", opt);
    cmd::run(opt).await
}
