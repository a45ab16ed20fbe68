//! Port trait abstracting the external build-and-run step.

use crate::error::ExecResult;
use camino::Utf8PathBuf;

/// Everything needed to build and run one driver program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub driver: Utf8PathBuf,
    pub migration: Utf8PathBuf,
    pub working_dir: Utf8PathBuf,
    /// Extra environment for the child, on top of the inherited one.
    pub env: Vec<(String, String)>,
}

/// How a launched driver ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    Failed {
        exit_code: Option<i32>,
        timed_out: bool,
    },
}

impl ExecutionOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

/// Builds and runs a driver program, blocking until it exits.
pub trait Launcher {
    fn launch(&self, request: &LaunchRequest) -> ExecResult<ExecutionOutcome>;
}
