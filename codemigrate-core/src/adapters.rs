//! Default process-backed launcher.

use crate::error::{ExecError, ExecResult};
use crate::ports::{ExecutionOutcome, LaunchRequest, Launcher};
use crate::settings::{ExecSettings, Toolchain};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use std::{io, thread};
use tracing::{debug, info, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs `<program> <args...> <driver>` inside the job workspace.
///
/// The child's stdout and stderr are inherited so compiler and migration
/// output stays visible; stdin is closed.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    pub toolchain: Toolchain,
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl ProcessLauncher {
    pub fn new(toolchain: Toolchain, timeout: Option<Duration>) -> Self {
        Self {
            toolchain,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_settings(settings: &ExecSettings) -> Self {
        Self::new(settings.toolchain.clone(), settings.timeout)
    }

    fn spawn_error(&self, source: io::Error) -> ExecError {
        ExecError::ExternalSpawn {
            program: self.toolchain.program.clone(),
            source,
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, request: &LaunchRequest) -> ExecResult<ExecutionOutcome> {
        if request.migration.parent() != request.driver.parent() {
            return Err(ExecError::invalid_migration(
                request.migration.clone(),
                format!("copy is not next to the driver {}", request.driver),
            ));
        }

        let mut cmd = Command::new(&self.toolchain.program);
        cmd.args(&self.toolchain.args)
            .arg(request.driver.as_std_path())
            .current_dir(request.working_dir.as_std_path())
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        info!(
            program = %self.toolchain.program,
            driver = %request.driver,
            "launching migration driver"
        );
        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        let status = match self.timeout {
            None => Some(child.wait().map_err(|e| self.spawn_error(e))?),
            Some(timeout) => wait_with_deadline(&mut child, timeout, self.poll_interval)
                .map_err(|e| self.spawn_error(e))?,
        };

        Ok(classify(status, self.timeout))
    }
}

/// Poll `child` until it exits or `timeout` elapses. On expiry the child is
/// killed and reaped, and `None` is returned.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    poll: Duration,
) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            if let Err(err) = child.kill() {
                debug!(error = %err, "kill after timeout");
            }
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(poll.min(deadline - now));
    }
}

fn classify(status: Option<ExitStatus>, timeout: Option<Duration>) -> ExecutionOutcome {
    match status {
        Some(status) if status.success() => ExecutionOutcome::Success,
        Some(status) => {
            warn!(exit_code = ?status.code(), "migration driver failed");
            ExecutionOutcome::Failed {
                exit_code: status.code(),
                timed_out: false,
            }
        }
        None => {
            warn!(timeout = ?timeout, "migration driver timed out; killed");
            ExecutionOutcome::Failed {
                exit_code: None,
                timed_out: true,
            }
        }
    }
}
