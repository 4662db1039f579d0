//! In-process workers: the checker runs inside an embedded evaluator

use super::{
    CancellationToken, LogMonitor, Monitor, SessionPool, WorkerInvoker, WorkerJob, WorkerResult,
};
use crate::{
    error::{Error, Result},
    types::{Diagnostic, PathConfig, WorkItem},
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Paths plus the named parameters of the checker's entry point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerConfig {
    pub paths: PathConfig,
    pub parameters: BTreeMap<String, String>,
}

impl CompilerConfig {
    pub fn new(paths: PathConfig, parameters: BTreeMap<String, String>) -> Self {
        Self { paths, parameters }
    }

    /// Boolean parameter, `false` when absent
    pub fn flag(&self, name: &str) -> bool {
        self.parameters
            .get(name)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}

/// A loaded interpreter session that can check modules
pub trait Evaluator: Send {
    /// Checks `modules` and returns the messages produced
    fn check(
        &mut self,
        modules: &[WorkItem],
        config: &CompilerConfig,
        monitor: &dyn Monitor,
    ) -> Result<Vec<Diagnostic>>;

    /// Flushes buffered output and error streams
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Creates evaluator sessions for a [`SessionPool`]
pub trait EvaluatorFactory: Sync {
    type Session: Evaluator;

    fn create(&self) -> Result<Self::Session>;
}

/// Runs each job on a session rented from a bounded pool
pub struct EvaluatorInvoker<F: EvaluatorFactory> {
    pool: SessionPool<F>,
    parameters: BTreeMap<String, String>,
    monitor: LogMonitor,
    cancel: CancellationToken,
}

impl<F: EvaluatorFactory> EvaluatorInvoker<F> {
    /// Invoker whose pool holds at most `max_sessions` sessions
    pub fn new(factory: F, max_sessions: usize) -> Self {
        Self {
            pool: SessionPool::new(factory, max_sessions),
            parameters: BTreeMap::new(),
            monitor: LogMonitor::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool = self.pool.with_idle_timeout(timeout);
        self
    }

    pub fn with_chatty_monitor(mut self, chatty: bool) -> Self {
        self.monitor = LogMonitor::new(chatty).with_cancellation(self.cancel.clone());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.monitor = self.monitor.with_cancellation(token.clone());
        self.cancel = token;
        self
    }

    pub fn pool(&self) -> &SessionPool<F> {
        &self.pool
    }
}

impl<F: EvaluatorFactory> WorkerInvoker for EvaluatorInvoker<F> {
    fn invoke(&self, job: &WorkerJob) -> Result<WorkerResult> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut session = self.pool.checkout()?;
        let config = CompilerConfig::new(job.paths.clone(), self.parameters.clone());
        let modules = job.modules.as_ref().map_or(&[][..], |m| m.items());

        info!("{} started on {} modules", job.role, modules.len());
        let checked = session.check(modules, &config, &self.monitor);
        if let Err(e) = session.flush() {
            warn!("Could not flush evaluator output: {}", e);
        }
        drop(session);

        Ok(WorkerResult::messages(job, checked?))
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}
