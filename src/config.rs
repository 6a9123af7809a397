//! Run configuration and the persisted `KEY=VALUE` configuration file.

use std::{collections::BTreeMap, env, fs, path::Path};

use crate::common::*;

/// IAM role granted to Spectrum external schemas when `SPECTRUM_IAM_ROLE`
/// is not configured.
const DEFAULT_SPECTRUM_IAM_ROLE: &str =
    "arn:aws:iam::985867512284:role/rol_data_infra_spectrum01";

/// Everything one run needs to know, built once from the environment and
/// threaded through the pipeline. No other component reads ambient
/// environment state.
#[derive(Clone, Debug)]
pub(crate) struct RunConfig {
    /// AWS profile used for S3 listing and the identity pre-check.
    pub(crate) aws_profile: Option<String>,
    /// Storage URIs to import from, each processed independently.
    pub(crate) locations: Vec<String>,
    /// Warehouse connection parameters (minus the per-location database).
    pub(crate) redshift: RedshiftConfig,
    /// IAM role bound to external schemas we create.
    pub(crate) spectrum_iam_role: String,
}

/// Redshift connection parameters shared by all locations.
#[derive(Clone, Debug)]
pub(crate) struct RedshiftConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) user: String,
    pub(crate) password: String,
}

impl RunConfig {
    /// Build the run configuration from the process environment.
    pub(crate) fn from_env() -> Result<RunConfig> {
        let locations = env::var("S3_LOCATION")
            .map_err(|_| format_err!("S3_LOCATION environment variable is missing"))?;
        let locations = locations
            .split(',')
            .map(|uri| uri.trim().to_owned())
            .filter(|uri| !uri.is_empty())
            .collect::<Vec<_>>();
        if locations.is_empty() {
            return Err(format_err!(
                "S3_LOCATION environment variable contains no locations"
            ));
        }

        let port = match env::var("REDSHIFT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("invalid REDSHIFT_PORT {:?}", value))?,
            Err(_) => 5439,
        };

        Ok(RunConfig {
            aws_profile: env::var("AWS_PROFILE").ok(),
            locations,
            redshift: RedshiftConfig {
                host: require_var("REDSHIFT_HOST")?,
                port,
                user: require_var("REDSHIFT_USER")?,
                password: require_var("REDSHIFT_PASSWORD")?,
            },
            spectrum_iam_role: env::var("SPECTRUM_IAM_ROLE")
                .unwrap_or_else(|_| DEFAULT_SPECTRUM_IAM_ROLE.to_owned()),
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| format_err!("{} environment variable is missing", name))
}

/// The persisted `KEY=VALUE` configuration file.
///
/// The interactive surface (or the `config` subcommand) rewrites this file
/// in full on every change, and `run` loads it into the environment at
/// startup.
#[derive(Clone, Debug, Default)]
pub(crate) struct EnvFile {
    values: BTreeMap<String, String>,
}

impl EnvFile {
    /// Load an env file, returning an empty one if it doesn't exist yet.
    pub(crate) fn load(path: &Path) -> Result<EnvFile> {
        if !path.exists() {
            return Ok(EnvFile::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("error reading {}", path.display()))?;
        EnvFile::parse(&text)
    }

    fn parse(text: &str) -> Result<EnvFile> {
        let mut values = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                format_err!("line {} is not KEY=VALUE: {:?}", idx + 1, line)
            })?;
            values.insert(key.trim().to_owned(), value.trim().to_owned());
        }
        Ok(EnvFile { values })
    }

    pub(crate) fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }

    /// Remove a key, returning whether it was present.
    pub(crate) fn unset(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Write the file back out, replacing its entire contents.
    pub(crate) fn store(&self, path: &Path) -> Result<()> {
        let mut text = String::new();
        for (key, value) in &self.values {
            text.push_str(key);
            text.push('=');
            text.push_str(value);
            text.push('\n');
        }
        fs::write(path, text)
            .with_context(|| format!("error writing {}", path.display()))
    }

    /// Export entries into the process environment. Variables that are
    /// already set win unless `overwrite` is passed.
    pub(crate) fn apply_to_env(&self, overwrite: bool) {
        for (key, value) in &self.values {
            if overwrite || env::var_os(key).is_none() {
                env::set_var(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let env_file = EnvFile::parse(
            "# comment\n\nAWS_PROFILE=dev\nS3_LOCATION = s3://b/x/y/z/schema1/feed/\n",
        )
        .unwrap();
        assert_eq!(env_file.values.get("AWS_PROFILE").unwrap(), "dev");
        assert_eq!(
            env_file.values.get("S3_LOCATION").unwrap(),
            "s3://b/x/y/z/schema1/feed/"
        );
    }

    #[test]
    fn rejects_lines_without_equals() {
        assert!(EnvFile::parse("AWS_PROFILE\n").is_err());
    }

    #[test]
    fn store_rewrites_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let mut env_file = EnvFile::default();
        env_file.set("REDSHIFT_HOST", "example.invalid");
        env_file.set("REDSHIFT_PORT", "5439");
        env_file.store(&path).unwrap();

        let mut env_file = EnvFile::load(&path).unwrap();
        assert!(env_file.unset("REDSHIFT_PORT"));
        assert!(!env_file.unset("REDSHIFT_PORT"));
        env_file.store(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "REDSHIFT_HOST=example.invalid\n");
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = EnvFile::load(&dir.path().join("absent.env")).unwrap();
        assert!(env_file.values.is_empty());
    }
}
