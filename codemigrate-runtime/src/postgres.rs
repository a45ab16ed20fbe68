use crate::connection::Session;
use crate::error::{RuntimeError, RuntimeResult};
use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

/// Blocking facade over `tokio-postgres` on a current-thread runtime.
///
/// The connection task is spawned onto the same runtime and makes progress
/// whenever a statement is driven with `block_on`.
pub(crate) struct PostgresSession {
    runtime: Runtime,
    client: Client,
}

impl PostgresSession {
    pub(crate) fn connect(open: &str) -> RuntimeResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let client = runtime.block_on(async {
            let (client, connection) = tokio_postgres::connect(open, NoTls).await?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!(error = %err, "postgres connection error");
                }
            });
            Ok::<_, tokio_postgres::Error>(client)
        })?;

        debug!("connected to postgres");
        Ok(Self { runtime, client })
    }
}

impl Session for PostgresSession {
    fn batch_execute(&mut self, sql: &str) -> RuntimeResult<()> {
        Ok(self.runtime.block_on(self.client.batch_execute(sql))?)
    }

    fn execute(&mut self, sql: &str) -> RuntimeResult<u64> {
        Ok(self.runtime.block_on(self.client.execute(sql, &[]))?)
    }

    fn execute_bookkeeping(
        &mut self,
        sql: &str,
        version: i64,
        is_applied: bool,
    ) -> RuntimeResult<u64> {
        let stmt = self.runtime.block_on(self.client.prepare(sql))?;
        let values: [&(dyn ToSql + Sync); 2] = [&version, &is_applied];
        let declared = stmt.params().len();
        if declared > values.len() {
            return Err(RuntimeError::BookkeepingParameters { declared });
        }
        Ok(self
            .runtime
            .block_on(self.client.execute(&stmt, &values[..declared]))?)
    }
}
