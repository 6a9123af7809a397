//! The ingestion orchestration pipeline.
//!
//! Locations are processed strictly sequentially, in sorted URI order.
//! Per-dataset failures are contained to the dataset; malformed URIs and
//! empty discoveries are contained to the location; authentication and
//! connection failures abort the run. Teardown (connection release and the
//! final schemas report) runs on every exit path.

use async_trait::async_trait;
use itertools::Itertools;
use tokio_postgres::Client;

use crate::clouds::aws;
use crate::common::*;
use crate::config::RunConfig;
use crate::discovery::{self, DatasetDescriptor};
use crate::location::SourceLocation;
use crate::report::Reporter;
use crate::warehouse::import::{ImportOutcome, ImportStatus, LocationImport};
use crate::warehouse::{provision, ConnectionManager, WarehouseTarget};

/// How processing one source location ended. Fatal errors are `Err` at the
/// call site instead; everything here lets the run continue.
#[derive(Debug)]
enum LocationOutcome {
    /// The URI was malformed; the location was skipped.
    Invalid { uri: String, reason: Error },
    /// Discovery found nothing; the location was skipped without touching
    /// the warehouse schemas.
    Empty,
    /// Imports were attempted. Individual datasets may still have failed.
    Imported {
        target_schema: String,
        outcomes: Vec<ImportOutcome>,
    },
}

/// Ordered list of target schemas actually provisioned, one entry per
/// location that reached the provisioning step.
#[derive(Debug, Default)]
pub(crate) struct RunResult {
    pub(crate) schemas_touched: Vec<String>,
}

/// Target schema name for one source schema on one day.
fn target_schema_name(schema_name: &str, today: &str) -> String {
    format!("{}_sls_{}", schema_name, today)
}

/// The warehouse-facing steps of one location. The bookkeeping loop only
/// talks to the warehouse through this seam.
#[async_trait]
trait LocationExecutor {
    async fn provision(&mut self, catalog_database: &str, target_schema: &str) -> Result<()>;

    async fn import_dataset(
        &mut self,
        location: &SourceLocation,
        target_schema: &str,
        today: &str,
        dataset: &DatasetDescriptor,
    ) -> ImportOutcome;

    fn connection_lost(&self) -> bool;
}

struct ClientExecutor<'a> {
    client: &'a Client,
    iam_role: &'a str,
    reporter: &'a Reporter,
}

#[async_trait]
impl LocationExecutor for ClientExecutor<'_> {
    async fn provision(&mut self, catalog_database: &str, target_schema: &str) -> Result<()> {
        provision::provision_schemas(self.client, catalog_database, target_schema, self.iam_role)
            .await
    }

    async fn import_dataset(
        &mut self,
        location: &SourceLocation,
        target_schema: &str,
        today: &str,
        dataset: &DatasetDescriptor,
    ) -> ImportOutcome {
        let import = LocationImport {
            location,
            target_schema,
            today,
        };
        import.import_dataset(self.client, dataset, self.reporter).await
    }

    fn connection_lost(&self) -> bool {
        self.client.is_closed()
    }
}

/// Run the whole pipeline. Everything the caller needs to know flows
/// through `reporter`; the returned result only carries the fatal error,
/// if any, so the CLI can set the process exit status.
pub(crate) async fn run(config: RunConfig, reporter: Reporter) -> Result<()> {
    let mut manager = ConnectionManager::new();
    let mut result = RunResult::default();

    let run_outcome = run_locations(&config, &reporter, &mut manager, &mut result).await;

    // Teardown runs on every exit path.
    if manager.release() {
        reporter.report("Database connection closed.");
    }
    if let Err(err) = &run_outcome {
        error!("pipeline failed: {:#}", err);
        reporter.report(format!("An error occurred: {:?}", err));
    }
    reporter.report(format!(
        "The final schema list: [{}]",
        result.schemas_touched.iter().join(", ")
    ));

    run_outcome
}

async fn run_locations(
    config: &RunConfig,
    reporter: &Reporter,
    manager: &mut ConnectionManager,
    result: &mut RunResult,
) -> Result<()> {
    // Refresh credentials before touching S3 or the warehouse.
    if aws::needs_login(config.aws_profile.as_deref()).await? {
        reporter.report(format!(
            "Running AWS SSO login for profile {:?}...",
            config.aws_profile.as_deref().unwrap_or("default")
        ));
        aws::sso_login(config.aws_profile.as_deref())
            .await
            .context("SSO login failed")?;
        reporter.report("AWS SSO login successful.");
    }

    // Computed once, so target schema names are stable for the whole run.
    let today = chrono::Local::now().format("%Y%m%d").to_string();

    let mut locations = config.locations.clone();
    locations.sort();
    for uri in &locations {
        reporter.report(format!("Starting import from {:?}", uri));
        match run_location(config, reporter, manager, result, &today, uri).await? {
            LocationOutcome::Invalid { uri, reason } => {
                reporter.report(format!("Invalid S3 path {:?}: {:#}", uri, reason));
            }
            LocationOutcome::Empty => {
                reporter.report("There are no files in the given directory.");
            }
            LocationOutcome::Imported {
                target_schema,
                outcomes,
            } => {
                for outcome in &outcomes {
                    if let Some(error) = &outcome.error {
                        debug!("dataset {} failed: {}", outcome.dataset.name, error);
                    }
                }
                let failed = outcomes
                    .iter()
                    .filter(|outcome| outcome.status == ImportStatus::Failed)
                    .map(|outcome| outcome.dataset.name.as_str())
                    .collect::<Vec<_>>();
                if failed.is_empty() {
                    reporter.report("Tables have been imported successfully");
                } else {
                    reporter.report(format!(
                        "{} of {} datasets failed to import: [{}]",
                        failed.len(),
                        outcomes.len(),
                        failed.iter().join(", ")
                    ));
                }
                reporter.report(format!("Schema info: {}", target_schema));
            }
        }
        reporter.report("--------------------------------------------------");
    }
    Ok(())
}

async fn run_location(
    config: &RunConfig,
    reporter: &Reporter,
    manager: &mut ConnectionManager,
    result: &mut RunResult,
    today: &str,
    uri: &str,
) -> Result<LocationOutcome> {
    let location = match uri.parse::<SourceLocation>() {
        Ok(location) => location,
        Err(reason) => {
            return Ok(LocationOutcome::Invalid {
                uri: uri.to_owned(),
                reason,
            })
        }
    };

    let target = WarehouseTarget::new(&config.redshift, location.database());
    let client = manager.ensure(&target, reporter).await.context(
        "could not open database connection; check your Redshift credentials",
    )?;

    let datasets = discovery::discover(config, &location).await?;
    if datasets.is_empty() {
        return Ok(LocationOutcome::Empty);
    }
    reporter.report(format!(
        "Datasets available are: [{}]",
        datasets.iter().map(|dataset| dataset.name.as_str()).join(", ")
    ));

    let mut executor = ClientExecutor {
        client,
        iam_role: &config.spectrum_iam_role,
        reporter,
    };
    import_location(&mut executor, &location, &datasets, result, today).await
}

/// Provision the location's schema pair, record it, and import each
/// discovered dataset, collecting one outcome per dataset.
async fn import_location<E: LocationExecutor>(
    executor: &mut E,
    location: &SourceLocation,
    datasets: &[DatasetDescriptor],
    result: &mut RunResult,
    today: &str,
) -> Result<LocationOutcome> {
    // Built from the lowercased schema name so the interpolated DDL, the
    // catalog binds in the grant queries, and the name Redshift actually
    // folds identifiers to all agree.
    let target_schema = target_schema_name(&location.database(), today);
    executor.provision(&location.database(), &target_schema).await?;
    result.schemas_touched.push(target_schema.clone());

    let mut outcomes = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let outcome = executor
            .import_dataset(location, &target_schema, today, dataset)
            .await;
        let failed = outcome.status == ImportStatus::Failed;
        outcomes.push(outcome);
        // A dead connection means every remaining dataset would fail the
        // same way; that's a connection failure, not a dataset failure.
        if failed && executor.connection_lost() {
            return Err(format_err!(
                "database connection lost while importing from {}",
                location
            ));
        }
    }
    Ok(LocationOutcome::Imported {
        target_schema,
        outcomes,
    })
}
