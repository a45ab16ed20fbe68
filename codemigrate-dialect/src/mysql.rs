use crate::{Backend, Dialect, VERSION_TABLE};

/// MySQL / MariaDB dialect.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn backend(&self) -> Backend {
        Backend::Mysql
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn bookkeeping_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version_id, is_applied) VALUES (?, ?);",
            VERSION_TABLE
        )
    }
}
