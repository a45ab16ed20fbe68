//! Configuration file loading for codemigrate.
//!
//! Discovers and loads `codemigrate.toml` from the project directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use codemigrate_core::{
    DatabaseConfig, DialectRegistry, ExecSettings, RuntimeDependency, SnapshotTransport, Toolchain,
};
use codemigrate_dialect::Backend;
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "codemigrate.toml";

/// Top-level configuration from codemigrate.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodemigrateConfig {
    /// Named database environments (`development`, `production`, ...).
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// Executor settings.
    pub exec: ExecConfig,

    /// Extra crates available to migration sources (`name = "version req"`).
    pub extra_dependencies: BTreeMap<String, String>,
}

/// One `[environments.<name>]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub driver: String,
    pub open: String,
    /// Runtime backend feature; defaults from the dialect.
    pub import: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransportConfig {
    #[default]
    Embedded,
    Environment,
}

impl From<TransportConfig> for SnapshotTransport {
    fn from(value: TransportConfig) -> Self {
        match value {
            TransportConfig::Embedded => SnapshotTransport::Embedded,
            TransportConfig::Environment => SnapshotTransport::Environment,
        }
    }
}

/// `[exec]` section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub migrations_dir: Utf8PathBuf,
    pub toolchain: Option<String>,
    pub toolchain_args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub snapshot_transport: TransportConfig,
    pub runtime_path: Option<Utf8PathBuf>,
    pub runtime_version: Option<String>,
    pub workspace_dir: Option<Utf8PathBuf>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            migrations_dir: Utf8PathBuf::from("db/migrations"),
            toolchain: None,
            toolchain_args: None,
            timeout_secs: None,
            snapshot_transport: TransportConfig::default(),
            runtime_path: None,
            runtime_version: None,
            workspace_dir: None,
        }
    }
}

/// Discover the codemigrate.toml config file in `project_dir`.
pub fn discover_config(project_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a codemigrate.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<CodemigrateConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<CodemigrateConfig> {
    let config: CodemigrateConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the config at `explicit`, or discover it in `project_dir`.
///
/// Returns the config together with the directory relative paths in it are
/// resolved against.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    project_dir: &Utf8Path,
) -> anyhow::Result<(CodemigrateConfig, Utf8PathBuf)> {
    match explicit {
        Some(path) => {
            // Drivers run inside the job workspace, so the base must be absolute.
            let base = match path.parent().filter(|p| !p.as_str().is_empty()) {
                Some(parent) if parent.is_absolute() => parent.to_path_buf(),
                Some(parent) => project_dir.join(parent),
                None => project_dir.to_path_buf(),
            };
            Ok((load_config(&project_dir.join(path))?, base))
        }
        None => match discover_config(project_dir) {
            Some(path) => Ok((load_config(&path)?, project_dir.to_path_buf())),
            None => Ok((CodemigrateConfig::default(), project_dir.to_path_buf())),
        },
    }
}

/// Values given on the command line; `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub env: String,
    pub timeout_secs: Option<u64>,
    pub transport: Option<TransportConfig>,
    pub toolchain: Option<String>,
    pub runtime_path: Option<Utf8PathBuf>,
    pub runtime_version: Option<String>,
    pub workspace_dir: Option<Utf8PathBuf>,
    pub dependencies: BTreeMap<String, String>,
}

/// Config file and CLI arguments, merged and resolved.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub database: DatabaseConfig,
    pub settings: ExecSettings,
    pub migrations_dir: Utf8PathBuf,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: CodemigrateConfig,
    base_dir: Utf8PathBuf,
}

impl ConfigMerger {
    pub fn new(config: CodemigrateConfig, base_dir: Utf8PathBuf) -> Self {
        Self { config, base_dir }
    }

    /// Merge with CLI arguments and resolve the selected environment.
    pub fn merge(
        self,
        cli: &CliOverrides,
        registry: &DialectRegistry,
    ) -> anyhow::Result<MergedConfig> {
        let Some(environment) = self.config.environments.get(&cli.env) else {
            let known: Vec<&str> = self.config.environments.keys().map(String::as_str).collect();
            bail!(
                "environment '{}' is not defined in {} (defined: {})",
                cli.env,
                CONFIG_FILE_NAME,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            );
        };

        let exec = &self.config.exec;
        let migrations_dir = self.resolve(&exec.migrations_dir);

        let mut database = DatabaseConfig::new(
            registry,
            &environment.driver,
            environment.open.as_str(),
            cli.env.as_str(),
            migrations_dir.clone(),
        )?
        .with_schema(environment.schema.clone());
        if let Some(import) = &environment.import {
            database = database.with_import(import.as_str());
        }
        // The driver runs inside the job workspace, so relative sqlite paths
        // must be anchored to the project.
        if database.dialect().backend() == Backend::Sqlite {
            database.open = self.resolve_sqlite_path(&database.open);
        }

        let mut settings = ExecSettings::default();
        let mut toolchain = Toolchain::default();
        if let Some(program) = cli.toolchain.clone().or_else(|| exec.toolchain.clone()) {
            toolchain.program = program;
        }
        if let Some(args) = &exec.toolchain_args {
            toolchain.args = args.clone();
        }
        settings.toolchain = toolchain;
        settings.timeout = cli
            .timeout_secs
            .or(exec.timeout_secs)
            .map(Duration::from_secs);
        settings.transport = cli.transport.unwrap_or(exec.snapshot_transport).into();
        settings.workspace_parent = cli
            .workspace_dir
            .as_ref()
            .or(exec.workspace_dir.as_ref())
            .map(|dir| self.resolve(dir));

        let runtime_path = cli.runtime_path.as_ref().or(exec.runtime_path.as_ref());
        let runtime_version = cli.runtime_version.as_ref().or(exec.runtime_version.as_ref());
        if let Some(path) = runtime_path {
            settings.runtime = RuntimeDependency::Path(self.resolve(path));
        } else if let Some(version) = runtime_version {
            settings.runtime = RuntimeDependency::Version(version.clone());
        }

        let mut dependencies = self.config.extra_dependencies.clone();
        for (name, req) in &cli.dependencies {
            dependencies.insert(name.clone(), req.clone());
        }
        settings.extra_dependencies = dependencies;

        debug!(
            env = %cli.env,
            driver = %environment.driver,
            transport = ?settings.transport,
            timeout = ?settings.timeout,
            "merged config"
        );
        Ok(MergedConfig {
            database,
            settings,
            migrations_dir,
        })
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn resolve_sqlite_path(&self, open: &str) -> String {
        if open == ":memory:" || open.starts_with("file:") {
            return open.to_string();
        }
        self.resolve(Utf8Path::new(open)).into_string()
    }
}

/// Parse `--dep name=req` values.
pub fn parse_dependencies(deps: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for entry in deps {
        let mut parts = entry.splitn(2, '=');
        let name = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("invalid dependency '{}': missing crate name", entry))?;
        let req = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("invalid dependency '{}': missing version", entry))?;
        out.insert(name.to_string(), req.to_string());
    }
    Ok(out)
}
