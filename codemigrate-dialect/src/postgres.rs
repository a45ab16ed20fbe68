//! PostgreSQL and Redshift dialects.

use crate::{Backend, Dialect, VERSION_TABLE};

#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn bookkeeping_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version_id, is_applied) VALUES ($1, $2);",
            VERSION_TABLE
        )
    }
}

/// Redshift speaks the PostgreSQL wire protocol and placeholder syntax.
#[derive(Debug, Clone, Default)]
pub struct RedshiftDialect;

impl RedshiftDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for RedshiftDialect {
    fn name(&self) -> &'static str {
        "redshift"
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn quote_ident(&self, ident: &str) -> String {
        PostgresDialect.quote_ident(ident)
    }

    fn bookkeeping_sql(&self) -> String {
        PostgresDialect.bookkeeping_sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_bookkeeping_uses_dollar_placeholders() {
        assert_eq!(
            PostgresDialect::new().bookkeeping_sql(),
            "INSERT INTO codemigrate_db_version (version_id, is_applied) VALUES ($1, $2);"
        );
    }

    #[test]
    fn postgres_quotes_embedded_quotes() {
        assert_eq!(PostgresDialect.quote_ident("my\"schema"), "\"my\"\"schema\"");
    }

    #[test]
    fn redshift_matches_postgres_sql() {
        assert_eq!(
            RedshiftDialect::new().bookkeeping_sql(),
            PostgresDialect::new().bookkeeping_sql()
        );
        assert_eq!(RedshiftDialect.backend(), Backend::Postgres);
        assert_eq!(RedshiftDialect.name(), "redshift");
    }
}
