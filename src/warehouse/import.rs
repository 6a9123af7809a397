//! Per-dataset import execution.

use tokio_postgres::Client;

use super::{grant, is_safe_identifier, pg_quote};
use crate::common::*;
use crate::discovery::DatasetDescriptor;
use crate::location::{SourceKind, SourceLocation};
use crate::report::Reporter;

/// Terminal status of one dataset's import attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ImportStatus {
    Succeeded,
    Failed,
}

/// Outcome recorded for one dataset. Never mutated after creation.
#[derive(Clone, Debug)]
pub(crate) struct ImportOutcome {
    pub(crate) dataset: DatasetDescriptor,
    pub(crate) external_table: String,
    pub(crate) view: String,
    pub(crate) status: ImportStatus,
    pub(crate) error: Option<String>,
}

/// Name of the server-side import procedure for one dataset.
fn procedure_name(kind: SourceKind, dataset: &str) -> String {
    format!("{}_{}_530", kind.procedure_family(), dataset)
}

/// Unqualified name of the external table the procedure creates.
fn external_table_name(kind: SourceKind, dataset: &str) -> String {
    format!("{}_{}", kind.procedure_family(), dataset)
}

/// The `SELECT procedure(...)` statement whose single result value is the
/// SQL needed to materialize the external table and its view.
fn import_procedure_sql(location: &SourceLocation, dataset: &str, today: &str) -> String {
    format!(
        "SELECT {procedure}({today}, {schema_base}, {path})",
        procedure = procedure_name(location.source_kind, dataset),
        today = pg_quote(today),
        schema_base = pg_quote(&format!("{}_sls", location.database())),
        path = pg_quote(&location.dataset_path(dataset)),
    )
}

/// Split the procedure's result into its two statements: statement 0
/// creates the external table, statement 1 the view. The two-statement
/// shape is a contract the server-side procedure must satisfy.
fn split_import_statements(result: &str) -> Result<(String, String)> {
    let mut statements = result
        .split(';')
        .map(|statement| statement.trim())
        .filter(|statement| !statement.is_empty());
    match (statements.next(), statements.next()) {
        (Some(create_table), Some(create_view)) => {
            Ok((create_table.to_owned(), create_view.to_owned()))
        }
        _ => Err(format_err!(
            "expected two semicolon-delimited statements from the import procedure, got {:?}",
            result
        )),
    }
}

/// Everything shared by the datasets of one location.
pub(crate) struct LocationImport<'a> {
    pub(crate) location: &'a SourceLocation,
    pub(crate) target_schema: &'a str,
    pub(crate) today: &'a str,
}

impl LocationImport<'_> {
    /// Run the full import sequence for one dataset: drop the stale
    /// external table, invoke the procedure, execute the returned table
    /// and view statements, then propagate privileges. Every failure is
    /// contained here and recorded in the returned outcome.
    #[instrument(
        level = "debug",
        skip_all,
        fields(dataset = %dataset.name, target_schema = %self.target_schema)
    )]
    pub(crate) async fn import_dataset(
        &self,
        client: &Client,
        dataset: &DatasetDescriptor,
        reporter: &Reporter,
    ) -> ImportOutcome {
        let table = external_table_name(self.location.source_kind, &dataset.name);
        let external_table = format!("{}_external.{}", self.target_schema, table);
        let view = format!("{}.{}", self.target_schema, table);

        match self.run(client, dataset, &table, reporter).await {
            Ok(()) => {
                debug!("imported {} and {}", external_table, view);
                ImportOutcome {
                    dataset: dataset.clone(),
                    external_table,
                    view,
                    status: ImportStatus::Succeeded,
                    error: None,
                }
            }
            Err(err) => {
                reporter.report(format!(
                    "Error importing dataset {}: {:#}",
                    dataset.name, err
                ));
                ImportOutcome {
                    dataset: dataset.clone(),
                    external_table,
                    view,
                    status: ImportStatus::Failed,
                    error: Some(format!("{:#}", err)),
                }
            }
        }
    }

    async fn run(
        &self,
        client: &Client,
        dataset: &DatasetDescriptor,
        table: &str,
        reporter: &Reporter,
    ) -> Result<()> {
        let name = &dataset.name;
        if !is_safe_identifier(name) {
            return Err(format_err!(
                "dataset name {:?} contains unsupported characters",
                name
            ));
        }

        // A re-run on the same day finds the previous run's external table.
        let drop_sql = format!(
            "DROP TABLE IF EXISTS {}_external.{}",
            self.target_schema, table
        );
        client
            .batch_execute(&drop_sql)
            .await
            .with_context(|| format!("error dropping {}_external.{}", self.target_schema, table))?;

        let procedure_sql = import_procedure_sql(self.location, name, self.today);
        debug!("invoking import procedure: {}", procedure_sql);
        let row = client.query_one(&procedure_sql, &[]).await.with_context(|| {
            format!(
                "error invoking {}",
                procedure_name(self.location.source_kind, name)
            )
        })?;
        let returned: String = row
            .try_get(0)
            .context("import procedure did not return a string")?;

        let (create_table, create_view) = split_import_statements(&returned)?;
        client
            .batch_execute(&create_table)
            .await
            .context("error creating external table")?;
        reporter.report(format!(
            "External table created: {}_external.{}",
            self.target_schema, table
        ));
        client
            .batch_execute(&create_view)
            .await
            .context("error creating view")?;
        reporter.report(format!("View created: {}.{}", self.target_schema, table));

        grant::grant_on_schema_pair(client, self.target_schema)
            .await
            .context("error granting privileges")?;
        Ok(())
    }
}
