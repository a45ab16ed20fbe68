//! Driver-program generation for code migrations.
//!
//! A code migration runs out of process: this crate renders a self-contained
//! cargo script (the *driver*) that links the user's migration source, opens a
//! single transaction, calls the direction-specific entry point, and records
//! the version through the dialect's bookkeeping statement.
//!
//! Responsibilities:
//! - Render arbitrary bytes as a Rust literal ([`embed`]).
//! - Name and validate migration entry points ([`entry_point`]).
//! - Render the embedded cargo manifest ([`manifest`]).
//! - Render the driver program itself ([`template`]).

pub mod embed;
pub mod entry_point;
pub mod error;
pub mod manifest;
pub mod template;

pub use embed::{byte_string_literal, str_literal};
pub use entry_point::{entry_point_name, validate_entry_point};
pub use error::RenderError;
pub use manifest::{RUNTIME_CRATE, RUNTIME_FEATURES, render_manifest};
pub use template::{
    DEFAULT_SNAPSHOT_VAR, DRIVER_FILE_NAME, DriverProgramParameters, RuntimeDependency,
    SnapshotSource, render_driver,
};
