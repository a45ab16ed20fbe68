//! Shared DTOs for the codemigrate workspace.
//!
//! # Design constraints
//! - [`ConfigSnapshot`] crosses a process boundary: the parent encodes it and a
//!   separately compiled driver program decodes it.
//! - Be conservative with breaking changes to the snapshot wire format.
//! - Prefer adding optional fields over changing semantics.

pub mod job;
pub mod snapshot;

pub use job::{Direction, JobError, MigrationJob};
pub use snapshot::{ConfigSnapshot, SnapshotError, decode_snapshot, encode_snapshot};

/// Schema identifiers.
pub mod schema {
    pub const SNAPSHOT_V1: &str = "codemigrate.snapshot.v1";
}
