use crate::connection::Session;
use crate::error::{RuntimeError, RuntimeResult};
use rusqlite::types::Value;
use tracing::debug;

pub(crate) struct SqliteSession {
    conn: rusqlite::Connection,
}

impl SqliteSession {
    pub(crate) fn open(path: &str) -> RuntimeResult<Self> {
        let conn = rusqlite::Connection::open(path)?;
        debug!(path, "opened sqlite database");
        Ok(Self { conn })
    }
}

impl Session for SqliteSession {
    fn batch_execute(&mut self, sql: &str) -> RuntimeResult<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    fn execute(&mut self, sql: &str) -> RuntimeResult<u64> {
        Ok(self.conn.execute(sql, [])? as u64)
    }

    fn execute_bookkeeping(
        &mut self,
        sql: &str,
        version: i64,
        is_applied: bool,
    ) -> RuntimeResult<u64> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = [Value::Integer(version), Value::Integer(i64::from(is_applied))];
        let declared = stmt.parameter_count();
        if declared > values.len() {
            return Err(RuntimeError::BookkeepingParameters { declared });
        }
        let rows = stmt.execute(rusqlite::params_from_iter(&values[..declared]))?;
        Ok(rows as u64)
    }
}
