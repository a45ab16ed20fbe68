use codemigrate_types::SnapshotError;
use thiserror::Error;

/// Failures inside a running driver program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("environment variable {var} is not set; the launcher must provide the config snapshot")]
    MissingSnapshotVar { var: String },

    #[error("no dialect registered for driver '{driver}'")]
    UnknownDriver { driver: String },

    #[error("driver was not compiled with the `{backend}` backend")]
    BackendUnavailable { backend: &'static str },

    #[error("bookkeeping statement declares {declared} parameters; at most 2 (version_id, is_applied) can be bound")]
    BookkeepingParameters { declared: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
