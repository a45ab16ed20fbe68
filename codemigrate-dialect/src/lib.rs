//! SQL dialects for codemigrate.
//!
//! A [`Dialect`] is consumed as an opaque capability: the executor only asks
//! it for the bookkeeping statement that records a version, and the driver
//! runtime asks it which connection [`Backend`] to open. Dialects are looked up
//! by driver name through an explicitly constructed [`DialectRegistry`]; there
//! is no process-wide registration.

mod mysql;
mod postgres;
mod registry;
mod sqlite;

pub use mysql::MysqlDialect;
pub use postgres::{PostgresDialect, RedshiftDialect};
pub use registry::{DialectConstructor, DialectRegistry, dialect_entry};
pub use sqlite::Sqlite3Dialect;

use std::fmt;

/// Table that holds one row per applied or reverted version.
pub const VERSION_TABLE: &str = "codemigrate_db_version";

/// Connection backend a dialect is served by inside the driver runtime.
///
/// The backend name doubles as the `codemigrate-runtime` cargo feature the
/// generated driver program is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Postgres,
    Mysql,
    Sqlite,
}

impl Backend {
    pub fn feature(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Mysql => "mysql",
            Backend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.feature())
    }
}

/// SQL syntax strategy for one database engine.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Driver name this dialect is registered under (e.g. `postgres`).
    fn name(&self) -> &'static str;

    fn backend(&self) -> Backend;

    /// Quote an identifier (schema, table, column).
    fn quote_ident(&self, ident: &str) -> String;

    /// Statement recording a version as applied (or reverted).
    ///
    /// It may declare up to two positional parameters, bound in order as
    /// `version_id` (BIGINT) and `is_applied` (BOOLEAN). Statements with fewer
    /// placeholders receive only the leading values.
    fn bookkeeping_sql(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_feature_names() {
        assert_eq!(Backend::Postgres.feature(), "postgres");
        assert_eq!(Backend::Sqlite.to_string(), "sqlite");
        assert_eq!(Backend::Mysql.to_string(), "mysql");
    }
}
