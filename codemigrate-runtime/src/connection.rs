//! Connection and transaction handles handed to migration code.

use crate::error::RuntimeResult;
use codemigrate_dialect::Dialect;
use std::sync::Arc;
use tracing::{debug, warn};

/// One open database session, as seen by the runtime.
///
/// Implemented once per backend; migration code only ever sees
/// [`Transaction`].
pub(crate) trait Session {
    fn batch_execute(&mut self, sql: &str) -> RuntimeResult<()>;

    fn execute(&mut self, sql: &str) -> RuntimeResult<u64>;

    /// Execute `sql` binding the leading values of `[version, is_applied]`
    /// for however many placeholders the statement declares.
    fn execute_bookkeeping(&mut self, sql: &str, version: i64, is_applied: bool)
    -> RuntimeResult<u64>;
}

/// Database handle rebuilt from a config snapshot.
pub struct Connection {
    session: Box<dyn Session>,
    dialect: Arc<dyn Dialect>,
}

impl Connection {
    pub(crate) fn new(session: Box<dyn Session>, dialect: Arc<dyn Dialect>) -> Self {
        Self { session, dialect }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Open the single transaction a migration runs in.
    pub fn begin(&mut self) -> RuntimeResult<Transaction<'_>> {
        self.session.batch_execute("BEGIN")?;
        debug!(dialect = self.dialect.name(), "transaction started");
        Ok(Transaction {
            session: self.session.as_mut(),
            finished: false,
        })
    }
}

/// The transaction a migration entry point receives.
///
/// Dropping a transaction that was neither committed nor rolled back issues
/// `ROLLBACK`.
pub struct Transaction<'c> {
    session: &'c mut dyn Session,
    finished: bool,
}

impl Transaction<'_> {
    /// Execute a single statement, returning the affected row count.
    pub fn execute(&mut self, sql: &str) -> RuntimeResult<u64> {
        self.session.execute(sql)
    }

    /// Execute one or more `;`-separated statements.
    pub fn batch_execute(&mut self, sql: &str) -> RuntimeResult<()> {
        self.session.batch_execute(sql)
    }

    pub fn commit(mut self) -> RuntimeResult<()> {
        self.finished = true;
        self.session.batch_execute("COMMIT")
    }

    pub fn rollback(mut self) -> RuntimeResult<()> {
        self.finished = true;
        self.session.batch_execute("ROLLBACK")
    }

    pub(crate) fn record_version(
        &mut self,
        sql: &str,
        version: i64,
        is_applied: bool,
    ) -> RuntimeResult<u64> {
        self.session.execute_bookkeeping(sql, version, is_applied)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("transaction abandoned; rolling back");
        if let Err(err) = self.session.batch_execute("ROLLBACK") {
            warn!(error = %err, "rollback failed; relying on the server to discard the transaction");
        }
    }
}
