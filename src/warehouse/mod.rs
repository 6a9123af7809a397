//! Redshift connection management and SQL helpers.

use std::fmt;

use tokio::task::JoinHandle;
use tokio_postgres::Client;

use crate::common::*;
use crate::config::RedshiftConfig;
use crate::report::Reporter;
use crate::tls::rustls_client_config;

pub(crate) mod grant;
pub(crate) mod import;
pub(crate) mod provision;

/// Connection parameters for one warehouse database.
#[derive(Clone, Debug)]
pub(crate) struct WarehouseTarget {
    pub(crate) database: String,
    host: String,
    port: u16,
    user: String,
    password: String,
}

impl WarehouseTarget {
    pub(crate) fn new(redshift: &RedshiftConfig, database: String) -> WarehouseTarget {
        WarehouseTarget {
            database,
            host: redshift.host.clone(),
            port: redshift.port,
            user: redshift.user.clone(),
            password: redshift.password.clone(),
        }
    }
}

/// Connect to the warehouse over TLS.
///
/// Statements run in auto-commit mode: we never open an explicit
/// transaction on this client.
#[instrument(level = "debug", skip(target), fields(database = %target.database))]
async fn connect(target: &WarehouseTarget) -> Result<(Client, JoinHandle<()>)> {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&target.host)
        .port(target.port)
        .user(&target.user)
        .password(&target.password)
        .dbname(&target.database);

    let tls_config = rustls_client_config()?;
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    let (client, connection) = config
        .connect(tls)
        .await
        .with_context(|| format!("could not connect to database {:?}", target.database))?;

    // The connection object performs the actual communication and must be
    // driven to completion in the background.
    let database = target.database.clone();
    let task = tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!("connection to {:?} ended with error: {}", database, err);
        }
    });

    Ok((client, task))
}

struct OpenConnection {
    database: String,
    client: Client,
    task: JoinHandle<()>,
}

/// Owns at most one warehouse connection at a time, reusing it while
/// consecutive locations resolve to the same database.
#[derive(Default)]
pub(crate) struct ConnectionManager {
    open: Option<OpenConnection>,
}

impl ConnectionManager {
    pub(crate) fn new() -> ConnectionManager {
        ConnectionManager { open: None }
    }

    /// Make sure the open connection targets `target.database`, reopening
    /// only on a database change. Open failure is fatal for the run.
    pub(crate) async fn ensure(
        &mut self,
        target: &WarehouseTarget,
        reporter: &Reporter,
    ) -> Result<&Client> {
        let reopen = needs_reopen(
            self.open.as_ref().map(|open| open.database.as_str()),
            &target.database,
        );
        if reopen {
            if self.release() {
                reporter.report("Previous database connection closed.");
            }
            reporter.report(format!("Connecting to {:?} database", target.database));
            let (client, task) = connect(target).await?;
            reporter.report("Database connection successful!");
            self.open = Some(OpenConnection {
                database: target.database.clone(),
                client,
                task,
            });
        }
        match &self.open {
            Some(open) => Ok(&open.client),
            None => Err(format_err!("no open connection")),
        }
    }

    /// Close the open connection, if any. Idempotent. Returns whether a
    /// connection was actually closed, so callers can report it.
    pub(crate) fn release(&mut self) -> bool {
        if let Some(open) = self.open.take() {
            // Dropping the client closes the socket; the driver task is
            // aborted in case it is still flushing.
            drop(open.client);
            open.task.abort();
            true
        } else {
            false
        }
    }
}

/// Reopen if and only if the resolved database differs from the previous
/// iteration's.
fn needs_reopen(current: Option<&str>, next: &str) -> bool {
    current != Some(next)
}

/// Escape and quote a SQL string literal. Needed because `$1`-style
/// parameters are not accepted everywhere in Redshift's SQL grammar.
pub(crate) fn pg_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// A SQL identifier, printed with quotes as necessary to prevent clashes
/// with keywords.
pub(crate) struct Ident<'a>(pub(crate) &'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\"\""))
    }
}

/// Can this name be interpolated into SQL without quoting surprises?
/// Object-storage naming allows more than this, but schema and dataset
/// names that fail the check would break the generated DDL anyway.
pub(crate) fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopens_only_on_database_change() {
        assert!(needs_reopen(None, "schema1"));
        assert!(needs_reopen(Some("schema1"), "schema2"));
        assert!(!needs_reopen(Some("schema1"), "schema1"));
    }

    #[test]
    fn pg_quote_doubles_single_quotes() {
        let examples = &[
            ("", "''"),
            ("a", "'a'"),
            ("'", "''''"),
            ("'hello'", "'''hello'''"),
        ];
        for &(input, expected) in examples {
            assert_eq!(pg_quote(input), expected);
        }
    }

    #[test]
    fn ident_quotes_embedded_double_quotes() {
        assert_eq!(Ident("orders").to_string(), "\"orders\"");
        assert_eq!(Ident("od\"d").to_string(), "\"od\"\"d\"");
    }

    #[test]
    fn safe_identifiers() {
        assert!(is_safe_identifier("orders_2024.v1-a"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("drop table"));
        assert!(!is_safe_identifier("x;y"));
    }
}
