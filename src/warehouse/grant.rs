//! Privilege propagation for a schema pair.

use tokio_postgres::Client;

use super::Ident;
use crate::common::*;

/// Blanket grants for one schema.
fn schema_grant_sql(schema: &str) -> [String; 2] {
    [
        format!("GRANT ALL ON SCHEMA {} TO PUBLIC", schema),
        format!(
            "GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA {} TO PUBLIC",
            schema
        ),
    ]
}

/// Per-object grant. The object name comes back from the catalog, so it is
/// quoted rather than charset-checked.
fn object_grant_sql(schema: &str, name: &str) -> String {
    format!("GRANT ALL PRIVILEGES ON {}.{} TO PUBLIC", schema, Ident(name))
}

const TABLES_IN_SCHEMA_SQL: &str = "\
SELECT table_name
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'";

const VIEWS_IN_SCHEMA_SQL: &str = "\
SELECT table_name
FROM information_schema.views
WHERE table_schema = $1";

/// Grant access on everything in the external/target schema pair to the
/// public role. Safe to re-run; every statement is an idempotent grant.
#[instrument(level = "debug", skip(client))]
pub(crate) async fn grant_on_schema_pair(client: &Client, target_schema: &str) -> Result<()> {
    let external_schema = format!("{}_external", target_schema);
    for schema in [external_schema.as_str(), target_schema] {
        for sql in schema_grant_sql(schema) {
            client
                .batch_execute(&sql)
                .await
                .with_context(|| format!("error granting on schema {}", schema))?;
        }

        // Schema-level grants do not reach objects that already exist, so
        // enumerate the catalog and grant on each table and view directly.
        for catalog_sql in [TABLES_IN_SCHEMA_SQL, VIEWS_IN_SCHEMA_SQL] {
            let rows = client
                .query(catalog_sql, &[&schema])
                .await
                .with_context(|| format!("error listing objects in schema {}", schema))?;
            for row in rows {
                let name: String = row
                    .try_get(0)
                    .context("catalog query returned a non-string name")?;
                let sql = object_grant_sql(schema, &name);
                client
                    .batch_execute(&sql)
                    .await
                    .with_context(|| format!("error granting on {}.{}", schema, name))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn schema_grants_cover_blanket_and_dml() {
        let [all, dml] = schema_grant_sql("schema1_sls_20260825_external");
        assert_eq!(
            all,
            "GRANT ALL ON SCHEMA schema1_sls_20260825_external TO PUBLIC"
        );
        assert_eq!(
            dml,
            "GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA \
             schema1_sls_20260825_external TO PUBLIC"
        );
    }

    #[test]
    fn object_grants_quote_catalog_names() {
        assert_eq!(
            object_grant_sql("schema1_sls_20260825", "perm_stage_orders"),
            "GRANT ALL PRIVILEGES ON schema1_sls_20260825.\"perm_stage_orders\" TO PUBLIC"
        );
    }
}
