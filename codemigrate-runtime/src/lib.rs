//! Runtime for generated codemigrate driver programs.
//!
//! Every driver rendered by `codemigrate-codegen` links this crate with
//! exactly one backend feature (`postgres` or `sqlite`) and walks the same
//! protocol:
//!
//! 1. [`init_logging`]
//! 2. [`decode_embedded`] / [`decode_from_env`] the config snapshot
//! 3. [`open_connection`] and [`Connection::begin`] one transaction
//! 4. call the migration entry point with `&mut Transaction`
//! 5. [`finalize`] (bookkeeping statement + commit), or [`abort`]
//!
//! Migration sources import [`Transaction`] from here.

mod connection;
mod error;
mod outcome;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use codemigrate_dialect::{Backend, Dialect, DialectRegistry};
pub use codemigrate_types::{ConfigSnapshot, Direction};
pub use connection::{Connection, Transaction};
pub use error::{RuntimeError, RuntimeResult};
pub use outcome::MigrationOutcome;

use codemigrate_types::decode_snapshot;
use connection::Session;
use std::fmt::Display;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber honouring `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Decode a snapshot compiled into the driver.
pub fn decode_embedded(bytes: &[u8]) -> RuntimeResult<ConfigSnapshot> {
    Ok(decode_snapshot(bytes)?)
}

/// Decode a snapshot handed over through an environment variable.
pub fn decode_from_env(var: &str) -> RuntimeResult<ConfigSnapshot> {
    let raw = std::env::var_os(var).ok_or_else(|| RuntimeError::MissingSnapshotVar {
        var: var.to_string(),
    })?;
    Ok(decode_snapshot(raw.as_encoded_bytes())?)
}

/// Rebuild a database handle from `snapshot`.
///
/// The dialect is looked up by driver name in `registry`; it decides which
/// backend serves the connection.
pub fn open_connection(
    snapshot: &ConfigSnapshot,
    registry: &DialectRegistry,
) -> RuntimeResult<Connection> {
    let dialect = registry
        .get(&snapshot.driver)
        .ok_or_else(|| RuntimeError::UnknownDriver {
            driver: snapshot.driver.clone(),
        })?;
    let backend = dialect.backend();
    if backend.feature() != snapshot.import {
        debug!(
            backend = backend.feature(),
            import = %snapshot.import,
            "snapshot import differs from dialect backend"
        );
    }

    let mut session: Box<dyn Session> = match backend {
        #[cfg(feature = "postgres")]
        Backend::Postgres => Box::new(postgres::PostgresSession::connect(&snapshot.open)?),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Box::new(sqlite::SqliteSession::open(&snapshot.open)?),
        other => {
            return Err(RuntimeError::BackendUnavailable {
                backend: other.feature(),
            });
        }
    };

    if let (Backend::Postgres, Some(schema)) = (backend, snapshot.schema.as_deref()) {
        session.batch_execute(&format!("SET search_path TO {}", dialect.quote_ident(schema)))?;
        debug!(schema, "search_path set");
    }

    info!(
        driver = %snapshot.driver,
        env = %snapshot.env,
        "database connection opened"
    );
    Ok(Connection::new(session, dialect))
}

/// Record the version and commit.
///
/// Runs `bookkeeping_sql` inside `tx`, then commits. On error the
/// transaction is dropped, which rolls it back.
pub fn finalize(
    snapshot: &ConfigSnapshot,
    mut tx: Transaction<'_>,
    direction: Direction,
    version: i64,
    bookkeeping_sql: &str,
) -> RuntimeResult<()> {
    let rows = tx.record_version(bookkeeping_sql, version, direction.is_applied())?;
    debug!(version, rows, "bookkeeping statement executed");
    tx.commit()?;
    info!(
        version,
        %direction,
        env = %snapshot.env,
        "migration committed"
    );
    Ok(())
}

/// Log a terminal driver failure and produce the failing exit status.
pub fn abort(context: &str, err: impl Display) -> ExitCode {
    error!(context, error = %err, "migration driver failed");
    ExitCode::FAILURE
}
