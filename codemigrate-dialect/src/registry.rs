//! Explicit dialect registry.
//!
//! The registry maps a driver name to a constructor. It is built once (see
//! [`DialectRegistry::builtin`]) and passed by reference to whatever needs a
//! lookup; it cannot be mutated after construction.

use crate::{Dialect, MysqlDialect, PostgresDialect, RedshiftDialect, Sqlite3Dialect};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a fresh dialect instance.
pub type DialectConstructor = Arc<dyn Fn() -> Arc<dyn Dialect> + Send + Sync>;

#[derive(Clone)]
pub struct DialectRegistry {
    constructors: BTreeMap<String, DialectConstructor>,
}

impl DialectRegistry {
    /// Registry with every dialect shipped in this crate.
    pub fn builtin() -> Self {
        Self::from_entries([
            dialect_entry("postgres", || Arc::new(PostgresDialect::new())),
            dialect_entry("redshift", || Arc::new(RedshiftDialect::new())),
            dialect_entry("mysql", || Arc::new(MysqlDialect::new())),
            dialect_entry("sqlite3", || Arc::new(Sqlite3Dialect::new())),
        ])
    }

    /// Registry from explicit `(name, constructor)` pairs. Later entries win
    /// on duplicate names.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, DialectConstructor)>,
    {
        let mut constructors = BTreeMap::new();
        for (name, ctor) in entries {
            if constructors.insert(name.clone(), ctor).is_some() {
                debug!(dialect = %name, "dialect registered twice; keeping the last entry");
            }
        }
        Self { constructors }
    }

    /// Construct the dialect registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.constructors.get(name).map(|ctor| ctor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered driver names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Pair a driver name with its constructor, for [`DialectRegistry::from_entries`].
pub fn dialect_entry<F>(name: &str, ctor: F) -> (String, DialectConstructor)
where
    F: Fn() -> Arc<dyn Dialect> + Send + Sync + 'static,
{
    (name.to_string(), Arc::new(ctor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct StubDialect;

    impl Dialect for StubDialect {
        fn name(&self) -> &'static str {
            "stub"
        }
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }
        fn quote_ident(&self, ident: &str) -> String {
            ident.to_string()
        }
        fn bookkeeping_sql(&self) -> String {
            "INSERT INTO version (id) VALUES (5)".to_string()
        }
    }

    #[test]
    fn builtin_names_are_sorted() {
        let registry = DialectRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["mysql", "postgres", "redshift", "sqlite3"]
        );
    }

    #[test]
    fn builtin_lookup_returns_matching_dialect() {
        let registry = DialectRegistry::builtin();
        for name in registry.names() {
            let dialect = registry.get(name).expect("registered");
            assert_eq!(dialect.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_none() {
        let registry = DialectRegistry::builtin();
        assert!(registry.get("oracle").is_none());
        assert!(!registry.contains("oracle"));
    }

    #[test]
    fn custom_entries_are_served() {
        let registry =
            DialectRegistry::from_entries([dialect_entry("stub", || Arc::new(StubDialect))]);
        let dialect = registry.get("stub").expect("stub");
        assert_eq!(dialect.bookkeeping_sql(), "INSERT INTO version (id) VALUES (5)");
        assert_eq!(registry.names(), vec!["stub"]);
    }

    #[test]
    fn later_duplicate_wins() {
        let registry = DialectRegistry::from_entries([
            dialect_entry("postgres", || Arc::new(PostgresDialect)),
            dialect_entry("postgres", || Arc::new(StubDialect)),
        ]);
        assert_eq!(registry.get("postgres").expect("entry").name(), "stub");
    }

    #[test]
    fn debug_lists_names() {
        let text = format!("{:?}", DialectRegistry::builtin());
        assert!(text.contains("sqlite3"));
    }
}
