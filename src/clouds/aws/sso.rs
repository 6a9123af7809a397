//! Interactive SSO login.

use super::aws_command;
use crate::common::*;

/// Run `aws sso login` for the profile, inheriting stdio so the user can
/// complete the browser flow.
#[instrument(level = "debug")]
pub(crate) async fn sso_login(profile: Option<&str>) -> Result<()> {
    let status = aws_command(profile)
        .args(["sso", "login"])
        .status()
        .await
        .context("error running `aws sso login` (is the AWS CLI installed?)")?;
    if status.success() {
        Ok(())
    } else {
        Err(format_err!("`aws sso login` failed with {}", status))
    }
}
