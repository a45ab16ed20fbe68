//! Clap-free settings for the executor.

use camino::{Utf8Path, Utf8PathBuf};
use codemigrate_codegen::RuntimeDependency;
use std::collections::BTreeMap;
use std::time::Duration;

/// Program (plus leading arguments) that builds and runs a driver file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: vec!["+nightly".to_string(), "-Zscript".to_string()],
        }
    }
}

/// How the config snapshot reaches the driver program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotTransport {
    /// Compiled into the driver source as a byte-string literal.
    #[default]
    Embedded,
    /// Passed through the `CODEMIGRATE_SNAPSHOT` environment variable.
    Environment,
}

/// Settings for running migration jobs.
#[derive(Debug, Clone)]
pub struct ExecSettings {
    pub toolchain: Toolchain,
    /// Upper bound on one driver build-and-run; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub transport: SnapshotTransport,
    /// Where job workspaces are created; the system temp dir when `None`.
    pub workspace_parent: Option<Utf8PathBuf>,
    pub runtime: RuntimeDependency,
    /// Additional crates made available to migration sources.
    pub extra_dependencies: BTreeMap<String, String>,
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::default(),
            timeout: None,
            transport: SnapshotTransport::default(),
            workspace_parent: None,
            runtime: default_runtime(),
            extra_dependencies: BTreeMap::new(),
        }
    }
}

/// The runtime crate next to this one when building from a checkout,
/// otherwise the published release matching this version.
pub fn default_runtime() -> RuntimeDependency {
    let sibling = Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|workspace| workspace.join("codemigrate-runtime"));
    match sibling {
        Some(path) if path.join("Cargo.toml").is_file() => RuntimeDependency::Path(path),
        _ => RuntimeDependency::Version(env!("CARGO_PKG_VERSION").to_string()),
    }
}
