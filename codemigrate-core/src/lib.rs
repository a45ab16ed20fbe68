//! Embeddable executor for code migrations.
//!
//! Runs one migration job out of process: the database configuration is
//! reduced to a [`ConfigSnapshot`](codemigrate_types::ConfigSnapshot), a driver
//! program is rendered into a private workspace next to a copy of the
//! migration source, and the driver is built and run by an external
//! toolchain. The core never talks to the database itself.
//!
//! # Port traits
//!
//! The build-and-run step sits behind [`Launcher`](ports::Launcher);
//! [`ProcessLauncher`](adapters::ProcessLauncher) is the default.
//!
//! # Entry points
//!
//! - [`run_job`](pipeline::run_job) — execute one migration job
//! - [`render_job`](pipeline::render_job) — render its driver for inspection

pub mod adapters;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod settings;
pub mod workspace;

pub use adapters::ProcessLauncher;
pub use db::DatabaseConfig;
pub use error::{ExecError, ExecResult};
pub use pipeline::{JobReport, render_job, run_job};
pub use ports::{ExecutionOutcome, LaunchRequest, Launcher};
pub use settings::{ExecSettings, SnapshotTransport, Toolchain};
pub use workspace::Workspace;

// Re-exported so embedders don't need the lower crates directly.
pub use codemigrate_codegen::{RUNTIME_FEATURES, RuntimeDependency};
pub use codemigrate_dialect::{Dialect, DialectRegistry};
pub use codemigrate_types::{Direction, MigrationJob};
