use crate::{Backend, Dialect, VERSION_TABLE};

#[derive(Debug, Clone, Default)]
pub struct Sqlite3Dialect;

impl Sqlite3Dialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for Sqlite3Dialect {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn bookkeeping_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version_id, is_applied) VALUES (?, ?);",
            VERSION_TABLE
        )
    }
}
