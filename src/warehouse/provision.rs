//! Idempotent schema provisioning.

use tokio_postgres::Client;

use super::pg_quote;
use crate::common::*;

/// `CREATE EXTERNAL SCHEMA` bound to the catalog database (the lowercased
/// source schema name) and the pre-configured Spectrum access role.
fn create_external_schema_sql(
    catalog_database: &str,
    target_schema: &str,
    iam_role: &str,
) -> String {
    format!(
        "CREATE EXTERNAL SCHEMA IF NOT EXISTS {target}_external FROM DATA CATALOG\n\
         DATABASE {database} IAM_ROLE {role}\n\
         CREATE EXTERNAL DATABASE IF NOT EXISTS",
        target = target_schema,
        database = pg_quote(catalog_database),
        role = pg_quote(iam_role),
    )
}

fn create_target_schema_sql(target_schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", target_schema)
}

/// Provision the external and run-scoped schemas for one location. Both
/// statements tolerate repeated invocation across runs on the same day.
#[instrument(level = "debug", skip(client))]
pub(crate) async fn provision_schemas(
    client: &Client,
    catalog_database: &str,
    target_schema: &str,
    iam_role: &str,
) -> Result<()> {
    let external_sql = create_external_schema_sql(catalog_database, target_schema, iam_role);
    client.batch_execute(&external_sql).await.with_context(|| {
        format!("error creating external schema {}_external", target_schema)
    })?;

    let target_sql = create_target_schema_sql(target_schema);
    client
        .batch_execute(&target_sql)
        .await
        .with_context(|| format!("error creating schema {}", target_schema))?;
    Ok(())
}
