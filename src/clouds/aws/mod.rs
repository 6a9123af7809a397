//! Wrappers for `aws` CLI commands.

use tokio::process::Command;

pub(crate) mod s3;
mod sso;
mod sts;

pub(crate) use sso::sso_login;
pub(crate) use sts::needs_login;

/// Create a `tokio::process::Command` invoking `aws`, scoped to the given
/// profile if one is configured.
fn aws_command(profile: Option<&str>) -> Command {
    let mut command = Command::new("aws");
    if let Some(profile) = profile {
        command.args(["--profile", profile]);
    }
    command
}
