use super::{Goal, GoalContext, GoalOutcome};
use crate::{
    command::CompilerCommand,
    config::{ConfigValidator, GoalValidator},
    error::{Error, Result},
    orchestrator::{Batch, BatchOutcome, Orchestrator},
    report::report,
    scanner::{StaleSourceScanner, StalenessScanner},
    worker::{ConsoleMode, EvaluatorFactory, EvaluatorInvoker, WorkerInvoker, WorkerJob, WorkerRole},
};
use std::sync::Arc;
use tracing::{info, warn};

const ERRORS_FOUND: &str = "Errors found while checking.";

/// The outcome of a compile run and its rendered diagnostic listing
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    pub outcome: BatchOutcome,
    pub listing: Vec<String>,
}

/// Checks every stale module with the configured external compiler
pub fn compile(ctx: &GoalContext) -> Result<GoalOutcome> {
    if Goal::Compile.is_skipped() {
        info!("Skipping Rascal compiler completely");
        return Ok(GoalOutcome::Skipped);
    }
    GoalValidator::compile().validate(&ctx.config)?;

    let invoker = ctx.process_invoker(Goal::Compile, ctx.config.compiler_parameters())?;
    compile_with(ctx, invoker, &StaleSourceScanner::default())
}

/// Checks every stale module with evaluators from `factory`, one pooled
/// session per parallel worker
pub fn compile_in_process<F: EvaluatorFactory>(ctx: &GoalContext, factory: F) -> Result<GoalOutcome> {
    if Goal::Compile.is_skipped() {
        info!("Skipping Rascal compiler completely");
        return Ok(GoalOutcome::Skipped);
    }
    GoalValidator::in_process().validate(&ctx.config)?;

    let sessions = ctx.estimator.estimate(ctx.config.compile.parallel_max);
    let invoker = EvaluatorInvoker::new(factory, sessions)
        .with_parameters(ctx.config.compiler_parameters())
        .with_chatty_monitor(ctx.config.verbose)
        .with_cancellation(ctx.cancel.clone());
    compile_with(ctx, invoker, &StaleSourceScanner::default())
}

/// Scans for stale modules and checks them with `invoker`.
///
/// Fails with "Errors found while checking." when the verdict fails; the
/// diagnostics have been logged by then.
pub fn compile_with<I: WorkerInvoker>(
    ctx: &GoalContext,
    invoker: I,
    scanner: &dyn StalenessScanner,
) -> Result<GoalOutcome> {
    let Some(batch) = prepare(ctx, scanner)? else {
        return Ok(GoalOutcome::UpToDate);
    };

    let orchestrator = Orchestrator::new(invoker, Arc::clone(&ctx.estimator))
        .with_options(ctx.config.orchestrator_options());
    let outcome = orchestrator.run(&batch)?;
    let listing = report(&outcome.aggregate, &batch.paths.srcs);

    let verdict = outcome.aggregate.verdict;
    if !verdict.passed {
        return Err(Error::ErrorsFound {
            goal: Goal::Compile.tag(),
            message: ERRORS_FOUND.to_string(),
        });
    }
    if verdict.errors_found() {
        warn!("Errors were found, but errors are reported as warnings");
    }

    Ok(GoalOutcome::Checked(CompileReport { outcome, listing }))
}

/// The command a single worker would run over every stale module, or `None`
/// when everything is up to date
pub fn dry_run(ctx: &GoalContext, scanner: &dyn StalenessScanner) -> Result<Option<CompilerCommand>> {
    GoalValidator::compile().validate(&ctx.config)?;
    let invoker = ctx.process_invoker(Goal::Compile, ctx.config.compiler_parameters())?;

    let Some(batch) = prepare(ctx, scanner)? else {
        return Ok(None);
    };
    let job = WorkerJob {
        id: 0,
        role: WorkerRole::Serial,
        modules: Some(batch.pre_checks.iter().chain(&batch.todo).cloned().collect()),
        paths: batch.paths,
        console: ConsoleMode::Inherit,
        concurrency: 1,
    };
    Ok(Some(invoker.command_for(&job)))
}

/// Finds the stale modules and completes the library path
fn prepare(ctx: &GoalContext, scanner: &dyn StalenessScanner) -> Result<Option<Batch>> {
    let configured = ctx.config.path_config();

    info!("Checking if any files need compilation...");
    let todo = scanner.scan(&configured.srcs, &configured.bin, &configured.ignores)?;
    if todo.is_empty() {
        info!("No stale source files have been found, skipping compilation.");
        return Ok(None);
    }

    info!("Stale source files have been found:");
    for item in &todo {
        info!("\t{}", item);
    }

    let pcfg = ctx.configured_paths()?;
    Ok(Some(Batch::new(pcfg, todo, &ctx.config.pre_checks())))
}
