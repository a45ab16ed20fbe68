use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which way a migration moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }

    /// Prefix used for the migration entry point (`Up_<version>` / `Down_<version>`).
    pub fn entry_prefix(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
        }
    }

    /// Value stored in the bookkeeping row's `is_applied` column.
    pub fn is_applied(self) -> bool {
        self.is_up()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("migration file {file} has no numeric version prefix (expected <version>_<name>.rs)")]
    MissingVersion { file: String },

    #[error("migration version must be greater than zero, got {version}")]
    NonPositiveVersion { version: i64 },
}

/// One execution of one migration in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationJob {
    pub version: i64,
    pub direction: Direction,
    pub source: Utf8PathBuf,
}

impl MigrationJob {
    pub fn new(
        version: i64,
        direction: Direction,
        source: impl Into<Utf8PathBuf>,
    ) -> Result<Self, JobError> {
        if version < 1 {
            return Err(JobError::NonPositiveVersion { version });
        }
        Ok(Self {
            version,
            direction,
            source: source.into(),
        })
    }

    /// Build a job whose version is taken from the file name, e.g.
    /// `20230101120000_add_users.rs` -> `20230101120000`.
    pub fn from_path(source: impl Into<Utf8PathBuf>, direction: Direction) -> Result<Self, JobError> {
        let source = source.into();
        let version = version_from_file_name(&source)?;
        Self::new(version, direction, source)
    }
}

fn version_from_file_name(path: &Utf8Path) -> Result<i64, JobError> {
    let missing = || JobError::MissingVersion {
        file: path.file_name().unwrap_or(path.as_str()).to_string(),
    };

    let stem = path.file_stem().ok_or_else(missing)?;
    let digits = stem.split('_').next().unwrap_or_default();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(missing());
    }
    digits.parse::<i64>().map_err(|_| missing())
}
