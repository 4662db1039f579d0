//! Workers: one invocation of the checker over one [`WorkSet`]
//!
//! The orchestrator is generic over [`WorkerInvoker`], which has two
//! implementations: [`ProcessInvoker`] spawns the tool as a child process and
//! [`EvaluatorInvoker`] calls an embedded evaluator rented from a pool.

pub mod cancel;
pub mod evaluator;
pub mod failure;
pub mod gate;
pub mod monitor;
pub mod pool;
pub mod process;

pub use cancel::CancellationToken;
pub use evaluator::{CompilerConfig, Evaluator, EvaluatorFactory, EvaluatorInvoker};
pub use failure::FirstFailure;
pub use gate::{GateRelease, PrePhaseGate};
pub use monitor::{LogMonitor, Monitor};
pub use pool::{PooledSession, SessionPool};
pub use process::{KILLED_BY_OS, ProcessInvoker};

use crate::{
    error::Result,
    types::{Diagnostic, PathConfig, WorkSet},
};
use std::fmt;

/// What a worker is doing within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    /// The only worker of a batch that was not partitioned
    Serial,
    /// Compiles the shared modules every chunk depends on
    PreCheck,
    /// One of the parallel chunks (0-based)
    Chunk(usize),
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerRole::Serial => f.write_str("serial checker"),
            WorkerRole::PreCheck => f.write_str("pre-checker"),
            WorkerRole::Chunk(i) => write!(f, "checker {}", i + 1),
        }
    }
}

/// Where a child process writes its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    /// Shares the parent's stdout and stderr
    Inherit,
    /// stdout and stderr are merged into a buffer returned with the result
    Capture,
}

/// Everything a worker needs to run once
#[derive(Debug, Clone)]
pub struct WorkerJob {
    /// Creation order within the batch, 0 for the first worker
    pub id: usize,
    pub role: WorkerRole,
    /// Modules to check; `None` lets the tool work on the whole project
    pub modules: Option<WorkSet>,
    pub paths: PathConfig,
    pub console: ConsoleMode,
    /// Number of workers planned to run side by side
    pub concurrency: usize,
}

impl WorkerJob {
    pub fn module_count(&self) -> usize {
        self.modules.as_ref().map_or(0, WorkSet::len)
    }
}

/// What a worker reported back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutput {
    /// Exit code of a child process, plus its output when it was captured
    Exit { code: i32, captured: Option<Vec<u8>> },
    /// Messages returned by an in-process evaluator
    Messages(Vec<Diagnostic>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    pub worker: usize,
    pub role: WorkerRole,
    pub modules: usize,
    pub output: WorkerOutput,
}

impl WorkerResult {
    pub fn exit(job: &WorkerJob, code: i32, captured: Option<Vec<u8>>) -> Self {
        Self {
            worker: job.id,
            role: job.role,
            modules: job.module_count(),
            output: WorkerOutput::Exit { code, captured },
        }
    }

    pub fn messages(job: &WorkerJob, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            worker: job.id,
            role: job.role,
            modules: job.module_count(),
            output: WorkerOutput::Messages(diagnostics),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.output {
            WorkerOutput::Exit { code, .. } => Some(code),
            WorkerOutput::Messages(_) => None,
        }
    }
}

/// Runs one worker to completion
pub trait WorkerInvoker: Sync {
    fn invoke(&self, job: &WorkerJob) -> Result<WorkerResult>;

    /// Name used in log messages
    fn name(&self) -> &'static str;
}
