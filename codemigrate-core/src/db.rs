//! Live database configuration and its connection-free snapshot.

use crate::error::{ExecError, ExecResult};
use camino::Utf8PathBuf;
use codemigrate_dialect::{Dialect, DialectRegistry};
use codemigrate_types::ConfigSnapshot;
use std::sync::Arc;

/// Configuration of the target database for one environment.
///
/// Holds the resolved [`Dialect`]; only [`DatabaseConfig::snapshot`] crosses
/// into the driver program.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Registry key the dialect was resolved under (e.g. `postgres`).
    pub driver: String,
    /// Connection string / DSN (or file path for sqlite).
    pub open: String,
    /// Runtime backend feature the driver links; defaults from the dialect.
    pub import: String,
    pub env: String,
    pub migrations_dir: Utf8PathBuf,
    pub schema: Option<String>,
    dialect: Arc<dyn Dialect>,
}

impl DatabaseConfig {
    /// Resolve `driver` in `registry` and build a config for it.
    pub fn new(
        registry: &DialectRegistry,
        driver: &str,
        open: impl Into<String>,
        env: impl Into<String>,
        migrations_dir: impl Into<Utf8PathBuf>,
    ) -> ExecResult<Self> {
        let dialect = registry
            .get(driver)
            .ok_or_else(|| ExecError::UnknownDialect {
                driver: driver.to_string(),
                known: registry.names().into_iter().map(String::from).collect(),
            })?;
        Ok(Self {
            driver: driver.to_string(),
            open: open.into(),
            import: dialect.backend().feature().to_string(),
            env: env.into(),
            migrations_dir: migrations_dir.into(),
            schema: None,
            dialect,
        })
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.import = import.into();
        self
    }

    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Project the config onto the fields the driver needs to reconnect.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            driver: self.driver.clone(),
            open: self.open.clone(),
            import: self.import.clone(),
            env: self.env.clone(),
            migrations_dir: self.migrations_dir.to_string(),
            schema: self.schema.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemigrate_types::{decode_snapshot, encode_snapshot};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn import_defaults_to_dialect_backend() {
        let registry = DialectRegistry::builtin();
        let pg = DatabaseConfig::new(&registry, "redshift", "host=x", "prod", "db/migrations")
            .expect("config");
        assert_eq!(pg.import, "postgres");
        let lite = DatabaseConfig::new(&registry, "sqlite3", "app.db", "dev", "db/migrations")
            .expect("config");
        assert_eq!(lite.import, "sqlite");
        assert_eq!(lite.dialect().name(), "sqlite3");
    }

    #[test]
    fn unknown_driver_is_rejected() {
        let err = DatabaseConfig::new(
            &DialectRegistry::builtin(),
            "oracle",
            "x",
            "dev",
            "db/migrations",
        )
        .unwrap_err();
        match err {
            ExecError::UnknownDialect { driver, known } => {
                assert_eq!(driver, "oracle");
                assert!(known.contains(&"postgres".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn snapshot_projects_every_field() {
        let cfg = DatabaseConfig::new(
            &DialectRegistry::builtin(),
            "postgres",
            "host=localhost dbname=app",
            "staging",
            "db/migrations",
        )
        .expect("config")
        .with_schema(Some("tenant_1".to_string()));
        assert_eq!(
            cfg.snapshot(),
            ConfigSnapshot {
                driver: "postgres".to_string(),
                open: "host=localhost dbname=app".to_string(),
                import: "postgres".to_string(),
                env: "staging".to_string(),
                migrations_dir: "db/migrations".to_string(),
                schema: Some("tenant_1".to_string()),
            }
        );
    }

    proptest! {
        #[test]
        fn config_snapshot_survives_codec(
            driver in prop::sample::select(vec!["postgres", "redshift", "mysql", "sqlite3"]),
            open in ".*",
            env in "[a-z_]{0,12}",
            dir in "[a-zA-Z0-9_/.-]{0,24}",
            schema in prop::option::of("[a-z_]{1,12}"),
        ) {
            let cfg = DatabaseConfig::new(&DialectRegistry::builtin(), driver, open, env, dir)
                .expect("config")
                .with_schema(schema);
            let encoded = encode_snapshot(&cfg.snapshot()).expect("encode");
            prop_assert_eq!(decode_snapshot(&encoded).expect("decode"), cfg.snapshot());
        }
    }
}
