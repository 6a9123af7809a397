//! Discovering datasets under a source location.

use std::collections::BTreeSet;

use crate::clouds::aws::s3;
use crate::common::*;
use crate::config::RunConfig;
use crate::location::{SourceKind, SourceLocation};

/// A normalized dataset identifier, unique within one location's
/// discovered set.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct DatasetDescriptor {
    pub(crate) name: String,
}

/// List the immediate child prefixes under `location` and derive the
/// deduplicated, sorted set of dataset names.
#[instrument(level = "debug", skip(config), fields(location = %location))]
pub(crate) async fn discover(
    config: &RunConfig,
    location: &SourceLocation,
) -> Result<Vec<DatasetDescriptor>> {
    let children = s3::list_child_prefixes(
        config.aws_profile.as_deref(),
        &location.bucket,
        &location.path_prefix,
    )
    .await?;
    Ok(normalize(location.source_kind, &children))
}

/// Apply the source-kind normalization rules to raw child prefixes.
pub(crate) fn normalize(kind: SourceKind, children: &[String]) -> Vec<DatasetDescriptor> {
    let mut names = BTreeSet::new();
    for child in children {
        let last = child.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        match kind {
            // Only children whose names mention `.csv` are datasets; the
            // descriptor drops the suffix.
            SourceKind::StageCsv => {
                if last.contains(".csv") {
                    let name = last.strip_suffix(".csv").unwrap_or(last);
                    names.insert(name.to_owned());
                }
            }
            // Every child is a dataset, but all `lab*` children collapse
            // into a single `lab` dataset.
            SourceKind::Stage1 => {
                let name = if last.starts_with("lab") { "lab" } else { last };
                names.insert(name.to_owned());
            }
        }
    }
    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(|name| DatasetDescriptor { name })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn dataset_names(descriptors: &[DatasetDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn csv_discovery_filters_and_strips_suffix() {
        let children = owned(&[
            "x/y/orders.csv/",
            "x/y/users.csv/",
            "x/y/readme.txt/",
            "x/y/users.csv",
        ]);
        let datasets = normalize(SourceKind::StageCsv, &children);
        assert_eq!(dataset_names(&datasets), vec!["orders", "users"]);
    }

    #[test]
    fn stage1_discovery_keeps_every_child() {
        let children = owned(&["a/b/orders/", "a/b/users/", "a/b/orders"]);
        let datasets = normalize(SourceKind::Stage1, &children);
        assert_eq!(dataset_names(&datasets), vec!["orders", "users"]);
    }

    #[test]
    fn stage1_collapses_lab_prefixed_children() {
        let children = owned(&[
            "a/b/lab_results/",
            "a/b/lab_archive/",
            "a/b/labs2024/",
            "a/b/users/",
        ]);
        let datasets = normalize(SourceKind::Stage1, &children);
        assert_eq!(dataset_names(&datasets), vec!["lab", "users"]);
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let children = owned(&["p/zeta.csv/", "p/alpha.csv/", "p/zeta.csv/"]);
        let datasets = normalize(SourceKind::StageCsv, &children);
        assert_eq!(dataset_names(&datasets), vec!["alpha", "zeta"]);
    }

    #[test]
    fn empty_listing_yields_no_datasets() {
        assert!(normalize(SourceKind::Stage1, &[]).is_empty());
        assert!(normalize(SourceKind::StageCsv, &[]).is_empty());
    }
}
