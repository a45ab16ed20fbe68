mod config;

use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use codemigrate_core::{
    DialectRegistry, Direction, ExecError, JobReport, MigrationJob, ProcessLauncher, render_job,
    run_job,
};
use config::{CliOverrides, ConfigMerger, MergedConfig, TransportConfig};
use fs_err as fs;
use serde::Serialize;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "codemigrate",
    version,
    about = "Runs code-defined schema migrations in isolated driver programs."
)]
struct Cli {
    /// Path to codemigrate.toml (default: ./codemigrate.toml).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Database environment from the config file.
    #[arg(
        long,
        short = 'e',
        global = true,
        env = "CODEMIGRATE_ENV",
        default_value = "development"
    )]
    env: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and run one migration in an isolated driver program.
    Run(RunArgs),
    /// Print the driver program a migration would run with.
    Render(RenderArgs),
    /// List the built-in SQL dialects.
    Dialects(DialectsArgs),
}

#[derive(Debug, Parser)]
struct JobArgs {
    /// Migration source file (looked up in migrations_dir if not found as given).
    migration: Utf8PathBuf,

    /// Direction to migrate.
    #[arg(long, value_enum, default_value = "up")]
    direction: DirectionArg,

    /// Version to run (default: the numeric prefix of the file name).
    #[arg(long)]
    version_id: Option<i64>,

    /// How the config snapshot reaches the driver.
    #[arg(long, value_enum)]
    transport: Option<TransportConfig>,

    /// Use a local checkout of codemigrate-runtime.
    #[arg(long, conflicts_with = "runtime_version")]
    runtime_path: Option<Utf8PathBuf>,

    /// Use a published codemigrate-runtime release.
    #[arg(long)]
    runtime_version: Option<String>,

    /// Extra crate for the migration, as name=version (repeatable).
    #[arg(long = "dep")]
    deps: Vec<String>,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Kill the driver if it runs longer than this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Program that builds and runs the driver (default: cargo).
    #[arg(long)]
    toolchain: Option<String>,

    /// Directory to create job workspaces in (default: system temp dir).
    #[arg(long)]
    workspace_dir: Option<Utf8PathBuf>,

    /// Output format for the job report.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    #[command(flatten)]
    job: JobArgs,

    /// Write the driver here instead of stdout.
    #[arg(long, short = 'o')]
    output: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct DialectsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        let code = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<ExecError>())
            .map(ExecError::exit_code)
            .unwrap_or(1);
        return ExitCode::from(code);
    }
    ExitCode::SUCCESS
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(cli.config.as_deref(), &cli.env, args),
        Command::Render(args) => cmd_render(cli.config.as_deref(), &cli.env, args),
        Command::Dialects(args) => cmd_dialects(args),
    }
}

fn project_dir() -> anyhow::Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("read current directory")?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("current directory {} is not UTF-8", p.display()))
}

fn merged_config(
    config_path: Option<&Utf8Path>,
    overrides: &CliOverrides,
    registry: &DialectRegistry,
) -> anyhow::Result<MergedConfig> {
    let project_dir = project_dir()?;
    let (file_config, base_dir) = config::load_or_default(config_path, &project_dir)
        .context("load codemigrate.toml config")?;
    ConfigMerger::new(file_config, base_dir).merge(overrides, registry)
}

fn overrides_for(env: &str, job: &JobArgs) -> anyhow::Result<CliOverrides> {
    Ok(CliOverrides {
        env: env.to_string(),
        transport: job.transport,
        runtime_path: job.runtime_path.clone(),
        runtime_version: job.runtime_version.clone(),
        dependencies: config::parse_dependencies(&job.deps)?,
        ..CliOverrides::default()
    })
}

fn build_job(args: &JobArgs, migrations_dir: &Utf8Path) -> anyhow::Result<MigrationJob> {
    let source = if args.migration.is_file() {
        args.migration.clone()
    } else {
        let candidate = migrations_dir.join(&args.migration);
        if !candidate.is_file() {
            bail!(
                "migration {} not found (also looked in {})",
                args.migration,
                migrations_dir
            );
        }
        candidate
    };
    let direction = Direction::from(args.direction);
    let job = match args.version_id {
        Some(version) => MigrationJob::new(version, direction, source)?,
        None => MigrationJob::from_path(source, direction)?,
    };
    debug!(version = job.version, source = %job.source, "resolved migration job");
    Ok(job)
}

fn cmd_run(config_path: Option<&Utf8Path>, env: &str, args: RunArgs) -> anyhow::Result<()> {
    let registry = DialectRegistry::builtin();
    let mut overrides = overrides_for(env, &args.job)?;
    overrides.timeout_secs = args.timeout_secs;
    overrides.toolchain = args.toolchain.clone();
    overrides.workspace_dir = args.workspace_dir.clone();

    let merged = merged_config(config_path, &overrides, &registry)?;
    let job = build_job(&args.job, &merged.migrations_dir)?;
    let launcher = ProcessLauncher::from_settings(&merged.settings);

    let report = run_job(&merged.settings, &merged.database, &job, &launcher)
        .with_context(|| format!("migration {} ({})", job.version, job.direction))?;
    print_report(&report, args.format)
}

fn print_report(report: &JobReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            let elapsed = report.ended_at - report.started_at;
            println!(
                "OK   {} {} via {} ({} ms)",
                report.version,
                report.direction,
                report.entry_point,
                elapsed.num_milliseconds()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

fn cmd_render(config_path: Option<&Utf8Path>, env: &str, args: RenderArgs) -> anyhow::Result<()> {
    let registry = DialectRegistry::builtin();
    let overrides = overrides_for(env, &args.job)?;
    let merged = merged_config(config_path, &overrides, &registry)?;
    let job = build_job(&args.job, &merged.migrations_dir)?;

    let program = render_job(&merged.settings, &merged.database, &job)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &program).with_context(|| format!("write {}", path))?;
            info!("wrote {}", path);
        }
        None => print!("{}", program),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DialectInfo<'a> {
    name: &'a str,
    backend: &'static str,
    runtime: bool,
}

fn cmd_dialects(args: DialectsArgs) -> anyhow::Result<()> {
    let registry = DialectRegistry::builtin();
    let mut infos = Vec::new();
    for name in registry.names() {
        let Some(dialect) = registry.get(name) else {
            continue;
        };
        let backend = dialect.backend().feature();
        infos.push(DialectInfo {
            name,
            backend,
            runtime: codemigrate_core::RUNTIME_FEATURES.contains(&backend),
        });
    }

    match args.format {
        OutputFormat::Text => {
            for info in &infos {
                let note = if info.runtime { "" } else { "  (render only)" };
                println!("{:<10} {}{}", info.name, info.backend, note);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
    }
    Ok(())
}
