//! The migration job orchestrator.
//!
//! `run_job` drives one job end to end: snapshot the config, create a
//! workspace, copy the migration in, render and write the driver, launch it,
//! and classify the outcome. The workspace is removed on every path.

use crate::db::DatabaseConfig;
use crate::error::{ExecError, ExecResult};
use crate::ports::{ExecutionOutcome, LaunchRequest, Launcher};
use crate::settings::{ExecSettings, SnapshotTransport};
use crate::workspace::Workspace;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use codemigrate_codegen::{
    DEFAULT_SNAPSHOT_VAR, DRIVER_FILE_NAME, DriverProgramParameters, SnapshotSource,
    entry_point_name, render_driver, validate_entry_point,
};
use codemigrate_types::{Direction, MigrationJob, encode_snapshot};
use fs_err as fs;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub version: i64,
    pub direction: Direction,
    pub entry_point: String,
    pub migration: Utf8PathBuf,
    pub migration_sha256: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// State of the version row after the commit (`true` after Up).
    pub version_applied: bool,
}

/// The migration source, read and checked once per job.
struct MigrationSource {
    entry_point: String,
    sha256: String,
}

fn load_migration(job: &MigrationJob) -> ExecResult<MigrationSource> {
    let bytes = fs::read(&job.source)
        .map_err(|e| ExecError::workspace_io(format!("read migration {}", job.source), e))?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| ExecError::invalid_migration(job.source.clone(), e.to_string()))?;
    let entry_point = entry_point_name(job.direction, job.version);
    validate_entry_point(text, &entry_point)?;
    Ok(MigrationSource {
        entry_point,
        sha256: sha256_hex(&bytes),
    })
}

/// Encode the snapshot and decide how it reaches the driver.
fn snapshot_source(
    settings: &ExecSettings,
    config: &DatabaseConfig,
) -> ExecResult<(SnapshotSource, Vec<(String, String)>)> {
    let encoded = encode_snapshot(&config.snapshot())?;
    Ok(match settings.transport {
        SnapshotTransport::Embedded => (SnapshotSource::Embedded(encoded), Vec::new()),
        SnapshotTransport::Environment => {
            let value = String::from_utf8_lossy(&encoded).into_owned();
            (
                SnapshotSource::Environment {
                    var: DEFAULT_SNAPSHOT_VAR.to_string(),
                },
                vec![(DEFAULT_SNAPSHOT_VAR.to_string(), value)],
            )
        }
    })
}

fn driver_parameters(
    settings: &ExecSettings,
    config: &DatabaseConfig,
    job: &MigrationJob,
    snapshot: SnapshotSource,
    migration_module: Utf8PathBuf,
) -> ExecResult<DriverProgramParameters> {
    let params = DriverProgramParameters::new(
        job,
        config.import.as_str(),
        snapshot,
        config.dialect().bookkeeping_sql(),
        migration_module,
        settings.runtime.clone(),
    )?
    .with_extra_dependencies(settings.extra_dependencies.clone());
    Ok(params)
}

/// Run one migration job through `launcher`.
///
/// Returns `ExecError::ExternalFailure` when the driver exits non-zero; the
/// version is never reported as recorded in that case.
pub fn run_job(
    settings: &ExecSettings,
    config: &DatabaseConfig,
    job: &MigrationJob,
    launcher: &dyn Launcher,
) -> ExecResult<JobReport> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        version = job.version,
        direction = %job.direction,
        env = %config.env,
        "migration job started"
    );

    let source = load_migration(job)?;
    let (snapshot, env) = snapshot_source(settings, config)?;

    let workspace = Workspace::create(settings.workspace_parent.as_deref())?;
    let copy = workspace.copy_migration(&job.source)?;
    let copied = fs::read(&copy)
        .map_err(|e| ExecError::workspace_io(format!("read migration copy {}", copy), e))?;
    if sha256_hex(&copied) != source.sha256 {
        return Err(ExecError::invalid_migration(
            job.source.clone(),
            "source changed while it was being copied",
        ));
    }

    let params = driver_parameters(settings, config, job, snapshot, copy.clone())?;
    let program = render_driver(&params)?;
    let driver = workspace.write_driver(&program)?;
    check_two_files(&workspace, &copy)?;

    let request = LaunchRequest {
        driver,
        migration: copy,
        working_dir: workspace.path().to_path_buf(),
        env,
    };
    let outcome = launcher.launch(&request)?;

    if let Err(err) = workspace.destroy() {
        warn!(error = %err, "workspace cleanup failed");
    }

    match outcome {
        ExecutionOutcome::Success => {
            let report = JobReport {
                run_id,
                version: job.version,
                direction: job.direction,
                entry_point: source.entry_point,
                migration: job.source.clone(),
                migration_sha256: source.sha256,
                started_at,
                ended_at: Utc::now(),
                version_applied: job.direction.is_applied(),
            };
            info!(%run_id, version = job.version, "migration job succeeded");
            Ok(report)
        }
        ExecutionOutcome::Failed {
            exit_code,
            timed_out,
        } => Err(ExecError::ExternalFailure {
            exit_code,
            timed_out,
        }),
    }
}

/// Render the driver `run_job` would launch, without a workspace.
///
/// The driver includes the migration from its original (absolute) location.
pub fn render_job(
    settings: &ExecSettings,
    config: &DatabaseConfig,
    job: &MigrationJob,
) -> ExecResult<String> {
    load_migration(job)?;
    let (snapshot, _env) = snapshot_source(settings, config)?;
    let module = absolute(&job.source)?;
    let params = driver_parameters(settings, config, job, snapshot, module)?;
    Ok(render_driver(&params)?)
}

fn check_two_files(workspace: &Workspace, copy: &Utf8Path) -> ExecResult<()> {
    let mut expected = vec![
        DRIVER_FILE_NAME.to_string(),
        copy.file_name().unwrap_or_default().to_string(),
    ];
    expected.sort();
    let found = workspace.artifacts()?;
    if found != expected {
        return Err(ExecError::workspace_io(
            format!("workspace {} holds unexpected files", workspace.path()),
            std::io::Error::other(format!("expected {:?}, found {:?}", expected, found)),
        ));
    }
    debug!(files = ?found, "workspace ready");
    Ok(())
}

fn absolute(path: &Utf8Path) -> ExecResult<Utf8PathBuf> {
    let resolved = fs::canonicalize(path)
        .map_err(|e| ExecError::workspace_io(format!("resolve {}", path), e))?;
    Utf8PathBuf::from_path_buf(resolved)
        .map_err(|p| ExecError::invalid_migration(path, format!("{} is not UTF-8", p.display())))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
