//! The driver program template.
//!
//! The rendered driver is a single-file cargo package: a `---` fenced manifest
//! followed by a `main` that performs exactly one migration against exactly
//! one transaction and reports the outcome through its exit status.

use crate::embed::{byte_string_literal, str_literal};
use crate::entry_point::entry_point_name;
use crate::error::RenderError;
use crate::manifest::render_manifest;
use camino::Utf8PathBuf;
use codemigrate_types::{Direction, MigrationJob};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;

/// File name of the generated driver inside a job workspace.
pub const DRIVER_FILE_NAME: &str = "codemigrate_driver.rs";

/// Environment variable read by drivers rendered with [`SnapshotSource::Environment`].
pub const DEFAULT_SNAPSHOT_VAR: &str = "CODEMIGRATE_SNAPSHOT";

/// How the encoded config snapshot reaches the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Compiled into the driver as a byte-string literal.
    Embedded(Vec<u8>),
    /// Read at startup from an environment variable set by the launcher.
    Environment { var: String },
}

/// Where the driver's manifest finds `codemigrate-runtime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeDependency {
    Path(Utf8PathBuf),
    Version(String),
}

/// Inputs for one driver render.
#[derive(Debug, Clone)]
pub struct DriverProgramParameters {
    pub version: i64,
    pub direction: Direction,
    /// Runtime backend feature (`postgres`, `sqlite`).
    pub import: String,
    pub snapshot: SnapshotSource,
    /// `Up_<version>` / `Down_<version>`; always derived from the job.
    pub entry_point: String,
    /// Opaque dialect statement that records the version.
    pub bookkeeping_sql: String,
    /// Path of the migration source the driver includes as `mod migration`.
    pub migration_module: Utf8PathBuf,
    pub runtime: RuntimeDependency,
    /// Extra `name = "version req"` dependencies available to migration code.
    pub extra_dependencies: BTreeMap<String, String>,
}

impl DriverProgramParameters {
    pub fn new(
        job: &MigrationJob,
        import: impl Into<String>,
        snapshot: SnapshotSource,
        bookkeeping_sql: impl Into<String>,
        migration_module: Utf8PathBuf,
        runtime: RuntimeDependency,
    ) -> Result<Self, RenderError> {
        let params = Self {
            version: job.version,
            direction: job.direction,
            import: import.into(),
            snapshot,
            entry_point: entry_point_name(job.direction, job.version),
            bookkeeping_sql: bookkeeping_sql.into(),
            migration_module,
            runtime,
            extra_dependencies: BTreeMap::new(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_extra_dependencies(mut self, deps: BTreeMap<String, String>) -> Self {
        self.extra_dependencies = deps;
        self
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.version < 1 {
            return Err(RenderError::invalid(
                "version",
                format!("{} is not a positive version", self.version),
            ));
        }
        if self.entry_point != entry_point_name(self.direction, self.version) {
            return Err(RenderError::invalid(
                "entry_point",
                format!(
                    "`{}` does not match direction {} and version {}",
                    self.entry_point, self.direction, self.version
                ),
            ));
        }
        if self.bookkeeping_sql.trim().is_empty() {
            return Err(RenderError::invalid("bookkeeping_sql", "statement is empty"));
        }
        if self.migration_module.as_str().is_empty() {
            return Err(RenderError::invalid("migration_module", "path is empty"));
        }
        if let SnapshotSource::Environment { var } = &self.snapshot {
            let valid = !var.is_empty()
                && var
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
            if !valid {
                return Err(RenderError::invalid(
                    "snapshot",
                    format!("'{}' is not a valid environment variable name", var),
                ));
            }
        }
        Ok(())
    }
}

/// Render the complete driver program source.
pub fn render_driver(params: &DriverProgramParameters) -> Result<String, RenderError> {
    params.validate()?;
    let manifest = render_manifest(params)?;

    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&manifest);
    if !manifest.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    let _ = writeln!(
        out,
        "//! codemigrate driver for version {} ({}). Generated; do not edit.",
        params.version, params.direction
    );
    out.push('\n');
    out.push_str("use codemigrate_runtime::{DialectRegistry, Direction, MigrationOutcome};\n");
    out.push_str("use std::process::ExitCode;\n\n");

    let _ = writeln!(out, "#[path = {}]", str_literal(params.migration_module.as_str()));
    out.push_str("#[allow(non_snake_case, dead_code)]\n");
    out.push_str("mod migration;\n\n");

    let _ = writeln!(out, "const VERSION: i64 = {};", params.version);
    let _ = writeln!(
        out,
        "const DIRECTION: Direction = Direction::{};",
        params.direction.entry_prefix()
    );
    let _ = writeln!(
        out,
        "const BOOKKEEPING_SQL: &str = {};",
        str_literal(&params.bookkeeping_sql)
    );
    match &params.snapshot {
        SnapshotSource::Embedded(bytes) => {
            let _ = writeln!(out, "const SNAPSHOT: &[u8] = {};", byte_string_literal(bytes));
        }
        SnapshotSource::Environment { var } => {
            let _ = writeln!(out, "const SNAPSHOT_VAR: &str = {};", str_literal(var));
        }
    }
    out.push('\n');

    out.push_str("fn main() -> ExitCode {\n");
    out.push_str("    codemigrate_runtime::init_logging();\n\n");
    let decode = match &params.snapshot {
        SnapshotSource::Embedded(_) => "codemigrate_runtime::decode_embedded(SNAPSHOT)",
        SnapshotSource::Environment { .. } => "codemigrate_runtime::decode_from_env(SNAPSHOT_VAR)",
    };
    push_step(&mut out, "snapshot", decode, "decode config snapshot");
    out.push_str("    let registry = DialectRegistry::builtin();\n");
    push_step(
        &mut out,
        "mut conn",
        "codemigrate_runtime::open_connection(&snapshot, &registry)",
        "open database",
    );
    push_step(&mut out, "mut tx", "conn.begin()", "begin transaction");
    let _ = writeln!(
        out,
        "    if let Err(err) = migration::{}(&mut tx).into_outcome() {{",
        params.entry_point
    );
    out.push_str("        drop(tx);\n");
    let _ = writeln!(
        out,
        "        return codemigrate_runtime::abort({}, err);",
        str_literal(&params.entry_point)
    );
    out.push_str("    }\n\n");
    out.push_str(
        "    match codemigrate_runtime::finalize(&snapshot, tx, DIRECTION, VERSION, BOOKKEEPING_SQL) {\n",
    );
    out.push_str("        Ok(()) => ExitCode::SUCCESS,\n");
    out.push_str("        Err(err) => codemigrate_runtime::abort(\"finalize migration\", err),\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    debug!(
        version = params.version,
        entry_point = %params.entry_point,
        bytes = out.len(),
        "rendered driver program"
    );
    Ok(out)
}

fn push_step(out: &mut String, binding: &str, expr: &str, context: &str) {
    let _ = writeln!(out, "    let {} = match {} {{", binding, expr);
    out.push_str("        Ok(value) => value,\n");
    let _ = writeln!(
        out,
        "        Err(err) => return codemigrate_runtime::abort({}, err),",
        str_literal(context)
    );
    out.push_str("    };\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(version: i64, direction: Direction) -> MigrationJob {
        MigrationJob::new(version, direction, format!("{}_noop.rs", version)).expect("job")
    }

    fn params(direction: Direction, snapshot: SnapshotSource) -> DriverProgramParameters {
        DriverProgramParameters::new(
            &job(5, direction),
            "sqlite",
            snapshot,
            "INSERT INTO version (id) VALUES (5)",
            Utf8PathBuf::from("/tmp/codemigrate-ws/5_noop.rs"),
            RuntimeDependency::Version("0.1".to_string()),
        )
        .expect("params")
    }

    #[test]
    fn entry_point_is_derived_from_job() {
        let up = params(Direction::Up, SnapshotSource::Embedded(vec![]));
        let down = params(Direction::Down, SnapshotSource::Embedded(vec![]));
        assert_eq!(up.entry_point, "Up_5");
        assert_eq!(down.entry_point, "Down_5");
    }

    #[test]
    fn rejects_empty_bookkeeping_sql() {
        let err = DriverProgramParameters::new(
            &job(5, Direction::Up),
            "sqlite",
            SnapshotSource::Embedded(vec![]),
            "   ",
            Utf8PathBuf::from("m.rs"),
            RuntimeDependency::Version("0.1".to_string()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidParameter {
                name: "bookkeeping_sql",
                ..
            }
        ));
    }

    #[test]
    fn render_rejects_tampered_entry_point() {
        let mut p = params(Direction::Up, SnapshotSource::Embedded(vec![]));
        p.entry_point = "Down_5".to_string();
        assert!(render_driver(&p).is_err());
    }

    #[test]
    fn render_rejects_bad_env_var_name() {
        let err = DriverProgramParameters::new(
            &job(5, Direction::Up),
            "sqlite",
            SnapshotSource::Environment {
                var: "NOT VALID".to_string(),
            },
            "INSERT INTO version (id) VALUES (5)",
            Utf8PathBuf::from("m.rs"),
            RuntimeDependency::Version("0.1".to_string()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("environment variable"));
    }

    #[test]
    fn driver_starts_with_front_matter() {
        let src = render_driver(&params(Direction::Up, SnapshotSource::Embedded(vec![])))
            .expect("render");
        assert!(src.starts_with("---\n[package]\n"));
        let fences = src.lines().filter(|l| *l == "---").count();
        assert_eq!(fences, 2);
    }

    #[test]
    fn driver_includes_migration_and_calls_entry_point() {
        let src = render_driver(&params(Direction::Up, SnapshotSource::Embedded(b"{}".to_vec())))
            .expect("render");
        assert!(src.contains("#[path = \"/tmp/codemigrate-ws/5_noop.rs\"]\n"));
        assert!(src.contains("mod migration;"));
        assert!(src.contains("migration::Up_5(&mut tx).into_outcome()"));
        assert!(!src.contains("Down_5"));
        assert!(src.contains("const DIRECTION: Direction = Direction::Up;"));
        assert!(src.contains("const VERSION: i64 = 5;"));
        assert!(src.contains(
            "const BOOKKEEPING_SQL: &str = \"INSERT INTO version (id) VALUES (5)\";"
        ));
        assert!(src.contains("const SNAPSHOT: &[u8] = b\"{}\";"));
        assert!(src.contains("codemigrate_runtime::decode_embedded(SNAPSHOT)"));
    }

    #[test]
    fn down_driver_calls_down_entry_point() {
        let src = render_driver(&params(Direction::Down, SnapshotSource::Embedded(vec![])))
            .expect("render");
        assert!(src.contains("migration::Down_5(&mut tx).into_outcome()"));
        assert!(src.contains("Direction::Down;"));
    }

    #[test]
    fn environment_snapshot_reads_variable() {
        let src = render_driver(&params(
            Direction::Up,
            SnapshotSource::Environment {
                var: DEFAULT_SNAPSHOT_VAR.to_string(),
            },
        ))
        .expect("render");
        assert!(src.contains("const SNAPSHOT_VAR: &str = \"CODEMIGRATE_SNAPSHOT\";"));
        assert!(src.contains("codemigrate_runtime::decode_from_env(SNAPSHOT_VAR)"));
        assert!(!src.contains("const SNAPSHOT: &[u8]"));
    }

    #[test]
    fn steps_run_in_contract_order() {
        let src = render_driver(&params(Direction::Up, SnapshotSource::Embedded(vec![])))
            .expect("render");
        let order = [
            "init_logging()",
            "decode_embedded(SNAPSHOT)",
            "open_connection(&snapshot, &registry)",
            "conn.begin()",
            "migration::Up_5(&mut tx)",
            "codemigrate_runtime::finalize(",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| src.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn failed_entry_point_drops_transaction_before_abort() {
        let src = render_driver(&params(Direction::Up, SnapshotSource::Embedded(vec![])))
            .expect("render");
        assert!(src.contains(
            "        drop(tx);\n        return codemigrate_runtime::abort(\"Up_5\", err);"
        ));
    }

    #[test]
    fn hostile_sql_is_escaped() {
        let mut p = params(Direction::Up, SnapshotSource::Embedded(vec![]));
        p.bookkeeping_sql = "INSERT INTO \"v\" VALUES (1); -- \"; panic!()".to_string();
        let src = render_driver(&p).expect("render");
        assert!(src.contains(
            r#"const BOOKKEEPING_SQL: &str = "INSERT INTO \"v\" VALUES (1); -- \"; panic!()";"#
        ));
    }
}
