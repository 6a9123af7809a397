//! Parsing `s3://` source locations.

use std::{fmt, str::FromStr};

use crate::common::*;
use crate::warehouse::is_safe_identifier;

/// Which staging family a location belongs to. Controls the discovery
/// normalization rules and the import-procedure name family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SourceKind {
    Stage1,
    StageCsv,
}

impl SourceKind {
    /// Prefix of the import-procedure names for this kind, e.g.
    /// `perm_stage1` in `perm_stage1_{dataset}_530`.
    pub(crate) fn procedure_family(self) -> &'static str {
        match self {
            SourceKind::Stage1 => "perm_stage1",
            SourceKind::StageCsv => "perm_stage",
        }
    }

    /// Suffix appended to a dataset name to form its storage path.
    pub(crate) fn path_suffix(self) -> &'static str {
        match self {
            SourceKind::Stage1 => "",
            SourceKind::StageCsv => ".csv",
        }
    }
}

/// One configured S3 prefix to import from. Derived once per input URI and
/// immutable afterwards.
#[derive(Clone, Debug)]
pub(crate) struct SourceLocation {
    pub(crate) bucket: String,
    pub(crate) schema_name: String,
    pub(crate) source_kind: SourceKind,
    pub(crate) path_prefix: String,
    raw_uri: String,
}

impl SourceLocation {
    /// The database this location's imports run against. Used as the
    /// connection-reuse key.
    pub(crate) fn database(&self) -> String {
        self.schema_name.to_lowercase()
    }

    /// Full storage path to one dataset under this location.
    pub(crate) fn dataset_path(&self, dataset: &str) -> String {
        let mut path = self.raw_uri.clone();
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(dataset);
        path.push_str(self.source_kind.path_suffix());
        path
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw_uri.fmt(f)
    }
}

impl FromStr for SourceLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let rest = s.strip_prefix("s3://").ok_or_else(|| {
            format_err!("invalid S3 path (must start with s3://): {:?}", s)
        })?;

        // The schema name lives at a fixed depth under the bucket.
        let segments = rest.split('/').collect::<Vec<_>>();
        if segments.len() <= 4 {
            return Err(format_err!("invalid S3 path format: {:?}", s));
        }
        let schema_name = segments[4].to_owned();
        if !is_safe_identifier(&schema_name) {
            return Err(format_err!(
                "schema segment {:?} contains unsupported characters: {:?}",
                schema_name,
                s
            ));
        }

        let url = s.parse::<Url>().with_context(|| format!("cannot parse {}", s))?;
        let bucket = url
            .host_str()
            .ok_or_else(|| format_err!("no bucket in {}", s))?
            .to_owned();
        let path_prefix = url.path().trim_start_matches('/').to_owned();

        let source_kind = if s.contains("stage1") {
            SourceKind::Stage1
        } else {
            SourceKind::StageCsv
        };

        Ok(SourceLocation {
            bucket,
            schema_name,
            source_kind,
            path_prefix,
            raw_uri: s.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_stage1_location() {
        let location = "s3://my-bucket/raw/2024/exports/schema1/stage1/"
            .parse::<SourceLocation>()
            .unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.schema_name, "schema1");
        assert_eq!(location.source_kind, SourceKind::Stage1);
        assert_eq!(location.path_prefix, "raw/2024/exports/schema1/stage1/");
        assert_eq!(location.database(), "schema1");
    }

    #[test]
    fn detects_csv_kind_when_stage1_is_absent() {
        let location = "s3://b/x/y/z/Sales/feed/".parse::<SourceLocation>().unwrap();
        assert_eq!(location.source_kind, SourceKind::StageCsv);
        assert_eq!(location.schema_name, "Sales");
        assert_eq!(location.database(), "sales");
    }

    #[test]
    fn rejects_uris_with_too_few_segments() {
        for uri in ["s3://b/x/y/z", "s3://b/x/y/z/", "s3://b", "s3://"] {
            assert!(uri.parse::<SourceLocation>().is_err(), "accepted {:?}", uri);
        }
    }

    #[test]
    fn rejects_non_s3_uris() {
        assert!("gs://b/x/y/z/schema1/".parse::<SourceLocation>().is_err());
        assert!("/local/path/x/y/z/".parse::<SourceLocation>().is_err());
    }

    #[test]
    fn rejects_sql_hostile_schema_segments() {
        assert!("s3://b/x/y/z/bad;drop/".parse::<SourceLocation>().is_err());
    }

    #[test]
    fn dataset_path_appends_kind_suffix() {
        let stage1 = "s3://b/x/y/z/schema1/stage1/"
            .parse::<SourceLocation>()
            .unwrap();
        assert_eq!(
            stage1.dataset_path("orders"),
            "s3://b/x/y/z/schema1/stage1/orders"
        );

        let csv = "s3://b/x/y/z/schema1/feed".parse::<SourceLocation>().unwrap();
        assert_eq!(csv.dataset_path("orders"), "s3://b/x/y/z/schema1/feed/orders.csv");
    }
}
