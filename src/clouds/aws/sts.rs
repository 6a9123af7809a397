//! AWS identity pre-check.

use super::aws_command;
use crate::common::*;

/// Check whether the profile's credentials are still valid. Returns `true`
/// if an interactive login is required before we can touch S3 or the
/// warehouse.
#[instrument(level = "debug")]
pub(crate) async fn needs_login(profile: Option<&str>) -> Result<bool> {
    let output = aws_command(profile)
        .args(["sts", "get-caller-identity"])
        .output()
        .await
        .context("error running `aws sts get-caller-identity` (is the AWS CLI installed?)")?;
    if output.status.success() {
        Ok(false)
    } else {
        debug!(
            "`aws sts get-caller-identity` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim(),
        );
        Ok(true)
    }
}
