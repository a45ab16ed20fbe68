//! Error types for codemigrate-core.
//!
//! Every failure of a migration job is returned to the caller as an
//! [`ExecError`]; nothing in this crate terminates the process. The
//! workspace is removed before the error reaches the caller.

use camino::Utf8PathBuf;
use codemigrate_codegen::RenderError;
use codemigrate_types::SnapshotError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The config snapshot could not be produced.
    #[error("encode config snapshot: {0}")]
    ConfigEncoding(#[from] SnapshotError),

    /// Driver parameters were rejected, or the migration lacks its entry point.
    #[error("render driver program: {0}")]
    TemplateRender(#[from] RenderError),

    /// Workspace creation, copy, write, or removal failed.
    #[error("{context}: {source}")]
    WorkspaceIo {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The toolchain could not be started (or waited on).
    #[error("failed to run `{program}`: {source}")]
    ExternalSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The driver ran and did not exit successfully. The version was not recorded.
    #[error("{}", external_failure_message(*exit_code, *timed_out))]
    ExternalFailure {
        exit_code: Option<i32>,
        timed_out: bool,
    },

    #[error("invalid migration {path}: {reason}")]
    InvalidMigration { path: Utf8PathBuf, reason: String },

    #[error("unknown dialect '{driver}' (known: {})", known.join(", "))]
    UnknownDialect { driver: String, known: Vec<String> },
}

fn external_failure_message(exit_code: Option<i32>, timed_out: bool) -> String {
    match (exit_code, timed_out) {
        (_, true) => "migration driver timed out and was terminated".to_string(),
        (Some(code), false) => format!("migration driver exited with status {}", code),
        (None, false) => "migration driver was terminated by a signal".to_string(),
    }
}

impl ExecError {
    pub(crate) fn workspace_io(context: impl Into<String>, source: io::Error) -> Self {
        ExecError::WorkspaceIo {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn invalid_migration(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        ExecError::InvalidMigration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the driver ran and failed (as opposed to never running).
    pub fn is_external_failure(&self) -> bool {
        matches!(self, ExecError::ExternalFailure { .. })
    }

    /// Returns the recommended process exit code for this error.
    ///
    /// A driver's own non-zero status is passed through; everything else is 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExecError::ExternalFailure {
                exit_code: Some(code),
                timed_out: false,
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_status_is_passed_through() {
        let err = ExecError::ExternalFailure {
            exit_code: Some(3),
            timed_out: false,
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_external_failure());
        assert_eq!(err.to_string(), "migration driver exited with status 3");
    }

    #[test]
    fn out_of_range_and_signalled_statuses_map_to_one() {
        for exit_code in [Some(-1), Some(256), None] {
            let err = ExecError::ExternalFailure {
                exit_code,
                timed_out: false,
            };
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn timeout_reports_exit_code_one() {
        let err = ExecError::ExternalFailure {
            exit_code: None,
            timed_out: true,
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn workspace_io_reports_context() {
        let err = ExecError::workspace_io(
            "create workspace",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "create workspace: denied");
    }

    #[test]
    fn unknown_dialect_lists_known_names() {
        let err = ExecError::UnknownDialect {
            driver: "oracle".to_string(),
            known: vec!["mysql".to_string(), "postgres".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown dialect 'oracle' (known: mysql, postgres)"
        );
    }
}
