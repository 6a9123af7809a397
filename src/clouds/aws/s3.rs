//! Listing S3 prefixes via `aws s3api`.

use serde_derive::Deserialize;

use super::aws_command;
use crate::common::*;

/// Output of `aws s3api list-objects-v2`, limited to the fields we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListObjectsV2Output {
    common_prefixes: Vec<CommonPrefix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefix {
    prefix: String,
}

/// List the immediate child prefixes under `bucket`/`prefix` (one level,
/// delimiter-bounded).
#[instrument(level = "debug")]
pub(crate) async fn list_child_prefixes(
    profile: Option<&str>,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<String>> {
    let output = aws_command(profile)
        .args([
            "s3api",
            "list-objects-v2",
            "--bucket",
            bucket,
            "--prefix",
            prefix,
            "--delimiter",
            "/",
            "--output",
            "json",
        ])
        .output()
        .await
        .context("error running `aws s3api list-objects-v2`")?;
    if !output.status.success() {
        return Err(format_err!(
            "`aws s3api list-objects-v2` failed with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }

    // When nothing matches the prefix at all, the CLI prints nothing.
    let stdout =
        String::from_utf8(output.stdout).context("`aws s3api` output was not UTF-8")?;
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed = serde_json::from_str::<ListObjectsV2Output>(&stdout)
        .context("cannot parse `aws s3api list-objects-v2` output")?;
    trace!("common prefixes under {}/{}: {:?}", bucket, prefix, parsed.common_prefixes);
    Ok(parsed
        .common_prefixes
        .into_iter()
        .map(|common| common.prefix)
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_common_prefixes() {
        let json = r#"{
            "CommonPrefixes": [
                { "Prefix": "raw/exports/schema1/feed/orders.csv/" },
                { "Prefix": "raw/exports/schema1/feed/users.csv/" }
            ],
            "KeyCount": 2
        }"#;
        let parsed = serde_json::from_str::<ListObjectsV2Output>(json).unwrap();
        let prefixes = parsed
            .common_prefixes
            .into_iter()
            .map(|common| common.prefix)
            .collect::<Vec<_>>();
        assert_eq!(
            prefixes,
            vec![
                "raw/exports/schema1/feed/orders.csv/",
                "raw/exports/schema1/feed/users.csv/",
            ]
        );
    }

    #[test]
    fn tolerates_missing_common_prefixes() {
        let parsed = serde_json::from_str::<ListObjectsV2Output>("{}").unwrap();
        assert!(parsed.common_prefixes.is_empty());
    }
}
