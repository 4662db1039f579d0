//! Build goals: what the plugin binding can ask for
//!
//! `compile` is the only goal that partitions its work; the others run the
//! tool once over the whole project.

pub mod compile;
pub mod console;
pub mod generate_sources;
pub mod package;
pub mod tutor;

pub use compile::{CompileReport, compile, compile_in_process, compile_with};
pub use console::console_command;
pub use generate_sources::generate_sources;
pub use package::package;
pub use tutor::tutor;

use crate::{
    command::CompilerCommand,
    config::Config,
    error::{Error, Result},
    libraries::{DependencyResolver, ManifestLibraryResolver},
    orchestrator::Orchestrator,
    resources::ResourceEstimator,
    types::PathConfig,
    worker::{CancellationToken, ConsoleMode, ProcessInvoker, WorkerJob, WorkerResult, WorkerRole},
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

pub const COMPILE_MAIN_CLASS: &str = "org.rascalmpl.shell.RascalCompile";
pub const TUTOR_MAIN_CLASS: &str = "org.rascalmpl.shell.RascalTutorCompile";
pub const PACKAGE_MAIN_CLASS: &str = "org.rascalmpl.shell.RascalPackage";
pub const SHELL_MAIN_CLASS: &str = "org.rascalmpl.shell.RascalShell";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Compile,
    Tutor,
    Package,
    GenerateSources,
    Console,
}

impl Goal {
    /// Short name used for skip switches
    pub fn tag(self) -> &'static str {
        match self {
            Goal::Compile => "compile",
            Goal::Tutor => "tutor",
            Goal::Package => "package",
            Goal::GenerateSources => "generate",
            Goal::Console => "console",
        }
    }

    pub fn main_class(self) -> &'static str {
        match self {
            Goal::Compile => COMPILE_MAIN_CLASS,
            Goal::Tutor => TUTOR_MAIN_CLASS,
            Goal::Package => PACKAGE_MAIN_CLASS,
            Goal::GenerateSources | Goal::Console => SHELL_MAIN_CLASS,
        }
    }

    /// Environment variable that turns this goal into a no-op, e.g. `RASCAL_COMPILE_SKIP`
    pub fn skip_variable(self) -> String {
        format!("RASCAL_{}_SKIP", self.tag().to_uppercase())
    }

    pub fn is_skipped(self) -> bool {
        std::env::var_os(self.skip_variable()).is_some()
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::GenerateSources => f.write_str("generate-sources"),
            other => f.write_str(other.tag()),
        }
    }
}

/// How a goal ended when it did not fail
#[derive(Debug, Clone)]
pub enum GoalOutcome {
    /// The skip switch was set
    Skipped,
    /// Every module was up to date
    UpToDate,
    Checked(CompileReport),
    Finished(WorkerResult),
}

/// Everything a goal needs besides its own parameters
pub struct GoalContext {
    pub config: Config,
    pub estimator: Arc<ResourceEstimator>,
    pub cancel: CancellationToken,
    resolver: Box<dyn DependencyResolver + Send + Sync>,
}

impl GoalContext {
    pub fn new(config: Config) -> Self {
        let resolver = ManifestLibraryResolver::new(config.dependencies());
        Self {
            config,
            estimator: Arc::new(ResourceEstimator::new()),
            cancel: CancellationToken::new(),
            resolver: Box::new(resolver),
        }
    }

    pub fn with_resolver(mut self, resolver: impl DependencyResolver + Send + Sync + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<ResourceEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The configured paths with resolved libraries appended
    pub fn configured_paths(&self) -> Result<PathConfig> {
        info!("configuring paths");
        let mut pcfg = self.config.path_config();
        for src in &pcfg.srcs {
            info!("\tregistered source location: {}", src.display());
        }
        for ignore in &pcfg.ignores {
            warn!("\tignoring sources in: {}", ignore.display());
        }

        let resolved = self.resolver.resolve(&pcfg.libs)?;
        for lib in resolved {
            pcfg.add_lib(lib);
        }
        for lib in &pcfg.libs {
            info!("\tregistered library location: {}", lib.display());
        }
        info!("Paths have been configured.");

        Ok(pcfg)
    }

    /// Process invoker starting `goal`'s main class with `parameters`
    pub fn process_invoker(&self, goal: Goal, parameters: BTreeMap<String, String>) -> Result<ProcessInvoker> {
        let launcher = self.config.launcher(goal.main_class())?;
        Ok(ProcessInvoker::new(launcher, Arc::clone(&self.estimator))
            .with_parameters(parameters)
            .with_verbose(self.config.verbose)
            .with_cancellation(self.cancel.clone()))
    }
}

/// The job of a goal that runs once over the whole project
pub fn whole_project_job(pcfg: &PathConfig) -> WorkerJob {
    WorkerJob {
        id: 0,
        role: WorkerRole::Serial,
        modules: None,
        paths: pcfg.clone(),
        console: ConsoleMode::Inherit,
        concurrency: 1,
    }
}

/// Command line of a whole-project goal, for dry runs
pub fn whole_project_command(invoker: &ProcessInvoker, pcfg: &PathConfig) -> CompilerCommand {
    invoker.command_for(&whole_project_job(pcfg))
}

/// Runs `invoker` once over the project; a nonzero exit code fails the goal
fn run_whole_project(ctx: &GoalContext, goal: Goal, invoker: ProcessInvoker, pcfg: &PathConfig) -> Result<GoalOutcome> {
    let orchestrator = Orchestrator::new(invoker, Arc::clone(&ctx.estimator));
    let result = orchestrator.run_whole_project(pcfg)?;

    match result.exit_code() {
        Some(0) | None => Ok(GoalOutcome::Finished(result)),
        Some(exit_code) => Err(Error::ToolFailed {
            goal: goal.tag(),
            exit_code,
        }),
    }
}
