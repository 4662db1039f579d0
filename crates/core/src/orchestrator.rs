//! Runs a batch of stale modules over one or more workers
//!
//! Small batches, and every batch when parallelism is off, go to a single
//! worker. Larger batches are partitioned: an optional pre-check worker
//! compiles the shared modules first, then every chunk runs side by side with
//! its own private output roots. All workers live inside one
//! [`std::thread::scope`], so none of them outlives the batch.

use crate::{
    error::{Error, Result},
    merge::{MergeMode, merge_output_folders},
    partition::{SERIAL_THRESHOLD, partition, should_partition},
    report::{Aggregate, SeverityPolicy, aggregate},
    resources::ResourceEstimator,
    types::{PathConfig, WorkItem, WorkSet},
    worker::{
        ConsoleMode, FirstFailure, GateRelease, PrePhaseGate, WorkerInvoker, WorkerJob,
        WorkerOutput, WorkerResult, WorkerRole,
    },
};
use std::any::Any;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Default upper bound on the number of parallel workers
pub const DEFAULT_PARALLEL_MAX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub parallel: bool,
    pub parallel_max: usize,
    pub policy: SeverityPolicy,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            parallel_max: DEFAULT_PARALLEL_MAX,
            policy: SeverityPolicy::default(),
        }
    }
}

/// The stale modules of one goal invocation
#[derive(Debug, Clone)]
pub struct Batch {
    pub paths: PathConfig,
    pub todo: Vec<WorkItem>,
    /// Stale modules to compile before everything else
    pub pre_checks: Vec<WorkItem>,
}

impl Batch {
    /// Only pre-checks that are themselves stale are kept; up-to-date ones are
    /// already available from the shared output root. Items are matched by
    /// canonical path and kept as the scanner spelled them.
    pub fn new(paths: PathConfig, todo: Vec<WorkItem>, pre_checks: &[WorkItem]) -> Self {
        let mut kept = Vec::new();
        for pre in pre_checks {
            match todo.iter().find(|item| *item == pre) {
                Some(item) if kept.contains(item) => {}
                Some(item) => kept.push(item.clone()),
                None if !pre.path().exists() => {
                    warn!("Pre-check module {} does not exist, ignoring it", pre)
                }
                None => debug!("Pre-check module {} is up to date", pre),
            }
        }
        let pre_checks = kept;
        Self {
            paths,
            todo,
            pre_checks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.todo.is_empty()
    }

    fn remainder(&self) -> usize {
        self.todo
            .iter()
            .filter(|item| !self.pre_checks.contains(item))
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub aggregate: Aggregate,
    /// One result per worker, in creation order
    pub results: Vec<WorkerResult>,
}

impl BatchOutcome {
    pub fn passed(&self) -> bool {
        self.aggregate.verdict.passed
    }
}

/// A chunk's job together with the temporary roots it writes into
struct PlannedWorker {
    job: WorkerJob,
    bin: TempDir,
    generated: TempDir,
}

pub struct Orchestrator<I: WorkerInvoker> {
    invoker: I,
    estimator: Arc<ResourceEstimator>,
    options: OrchestratorOptions,
}

impl<I: WorkerInvoker> Orchestrator<I> {
    pub fn new(invoker: I, estimator: Arc<ResourceEstimator>) -> Self {
        Self {
            invoker,
            estimator,
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Checks every module of `batch` and returns the combined verdict.
    ///
    /// Worker failures are only reported after every worker has finished and
    /// the outputs have been merged.
    pub fn run(&self, batch: &Batch) -> Result<BatchOutcome> {
        if batch.is_empty() {
            info!("Nothing to check");
            return Ok(BatchOutcome {
                aggregate: aggregate(&[], self.options.policy),
                results: Vec::new(),
            });
        }

        let results = if self.use_parallel(batch) {
            self.run_parallel(batch)?
        } else {
            vec![self.run_serial(batch)?]
        };

        Ok(BatchOutcome {
            aggregate: aggregate(&results, self.options.policy),
            results,
        })
    }

    /// Runs the tool once over the whole project, without a module list
    pub fn run_whole_project(&self, paths: &PathConfig) -> Result<WorkerResult> {
        let job = WorkerJob {
            id: 0,
            role: WorkerRole::Serial,
            modules: None,
            paths: paths.clone(),
            console: ConsoleMode::Inherit,
            concurrency: 1,
        };
        debug!("Running {} worker over the whole project", self.invoker.name());
        self.invoker.invoke(&job)
    }

    fn use_parallel(&self, batch: &Batch) -> bool {
        if !self.options.parallel || batch.remainder() <= SERIAL_THRESHOLD {
            return false;
        }
        let workers = self.estimator.estimate(self.options.parallel_max);
        should_partition(batch.remainder(), workers)
    }

    fn run_serial(&self, batch: &Batch) -> Result<WorkerResult> {
        info!("Running single {} checker", self.invoker.name());

        let modules: WorkSet = batch
            .pre_checks
            .iter()
            .chain(batch.todo.iter())
            .cloned()
            .collect();
        let job = WorkerJob {
            id: 0,
            role: WorkerRole::Serial,
            modules: Some(modules),
            paths: batch.paths.clone(),
            console: ConsoleMode::Inherit,
            concurrency: 1,
        };

        let result = self.invoker.invoke(&job)?;
        log_finished(&result);
        Ok(result)
    }

    fn run_parallel(&self, batch: &Batch) -> Result<Vec<WorkerResult>> {
        let workers = self.estimator.estimate(self.options.parallel_max);
        let chunks = partition(&batch.todo, &batch.pre_checks, workers);
        let concurrency = chunks.len() + 1;

        let mut shared = batch.paths.clone();
        // chunks reuse the artifacts that are already up to date
        shared.add_lib(&batch.paths.bin);

        let pre_check = if batch.pre_checks.is_empty() {
            None
        } else {
            let job = WorkerJob {
                id: 0,
                role: WorkerRole::PreCheck,
                modules: Some(batch.pre_checks.iter().cloned().collect()),
                paths: shared.clone(),
                console: ConsoleMode::Inherit,
                concurrency: 1,
            };
            let planned = plan(job)?;
            shared.add_lib(planned.bin.path());
            Some(planned)
        };

        let first_id = usize::from(pre_check.is_some());
        let planned: Vec<PlannedWorker> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, modules)| {
                plan(WorkerJob {
                    id: first_id + index,
                    role: WorkerRole::Chunk(index),
                    modules: Some(modules),
                    paths: shared.clone(),
                    console: if index == 0 {
                        ConsoleMode::Inherit
                    } else {
                        ConsoleMode::Capture
                    },
                    concurrency,
                })
            })
            .collect::<Result<_>>()?;

        let gate = PrePhaseGate::new();
        let failure = FirstFailure::new();

        let mut results: Vec<WorkerResult> = thread::scope(|s| {
            let pre_handle = match &pre_check {
                Some(pre) => {
                    let (gate, failure) = (&gate, &failure);
                    let permits = planned.len() + 1;
                    info!(
                        "Pre-compiling common modules {}",
                        module_names(&pre.job)
                    );
                    Some(s.spawn(move || {
                        let _release = GateRelease::new(gate, permits);
                        self.invoke_recorded(&pre.job, failure)
                    }))
                }
                None => {
                    gate.release(planned.len() + 1);
                    None
                }
            };

            let handles: Vec<_> = planned
                .iter()
                .map(|worker| {
                    let (gate, failure) = (&gate, &failure);
                    s.spawn(move || {
                        gate.acquire();
                        info!(
                            "{} started on a parallel job of {} modules",
                            worker.job.role,
                            worker.job.module_count()
                        );
                        self.invoke_recorded(&worker.job, failure)
                    })
                })
                .collect();

            let mut results = Vec::new();
            if let (Some(handle), Some(pre)) = (pre_handle, &pre_check) {
                results.extend(join_recorded(handle.join(), pre.job.id, &failure));
            }
            for (handle, worker) in handles.into_iter().zip(&planned) {
                results.extend(join_recorded(handle.join(), worker.job.id, &failure));
            }
            results
        });

        results.sort_by_key(|result| result.worker);
        for result in &results {
            print_captured(result);
            log_finished(result);
        }

        let roots: Vec<&PlannedWorker> = pre_check.iter().chain(planned.iter()).collect();
        let bins: Vec<_> = roots.iter().map(|w| w.bin.path()).collect();
        let generated: Vec<_> = roots.iter().map(|w| w.generated.path()).collect();

        // outputs are merged whatever the outcome, so that finished work is kept
        let merged = merge_output_folders(&batch.paths.bin, &bins, MergeMode::Required).and_then(|()| {
            merge_output_folders(&batch.paths.generated_sources, &generated, MergeMode::BestEffort)
        });

        if let Some(err) = failure.into_inner() {
            if let Err(merge_err) = merged {
                warn!("Could not merge worker output: {}", merge_err);
            }
            return Err(err);
        }
        merged?;

        Ok(results)
    }

    fn invoke_recorded(&self, job: &WorkerJob, failure: &FirstFailure) -> Option<WorkerResult> {
        match self.invoker.invoke(job) {
            Ok(result) => Some(result),
            Err(err) => {
                failure.record(job.id, err);
                None
            }
        }
    }
}

/// Creates the private output roots of a worker and points its job at them
fn plan(mut job: WorkerJob) -> Result<PlannedWorker> {
    let bin = tempfile::Builder::new()
        .prefix("rascal-checker")
        .tempdir()
        .map_err(Error::ResourcePreparation)?;
    let generated = tempfile::Builder::new()
        .prefix("rascal-sources")
        .tempdir()
        .map_err(Error::ResourcePreparation)?;

    job.paths = job.paths.with_private_output(bin.path(), generated.path());
    Ok(PlannedWorker {
        job,
        bin,
        generated,
    })
}

fn join_recorded(
    joined: thread::Result<Option<WorkerResult>>,
    worker: usize,
    failure: &FirstFailure,
) -> Option<WorkerResult> {
    match joined {
        Ok(result) => result,
        Err(payload) => {
            failure.record(
                worker,
                Error::WorkerPanicked {
                    worker,
                    message: panic_message(payload.as_ref()),
                },
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn module_names(job: &WorkerJob) -> String {
    job.modules
        .iter()
        .flat_map(WorkSet::items)
        .map(|item| item.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_captured(result: &WorkerResult) {
    if let WorkerOutput::Exit {
        captured: Some(output),
        ..
    } = &result.output
    {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(output).and_then(|()| stdout.flush()) {
            warn!("Could not print the output of {}: {}", result.role, e);
        }
    }
}

fn log_finished(result: &WorkerResult) {
    match &result.output {
        WorkerOutput::Exit { code, .. } => info!(
            "{} finished ({}) on a job of {} modules",
            result.role, code, result.modules
        ),
        WorkerOutput::Messages(messages) => info!(
            "{} finished with {} messages on a job of {} modules",
            result.role,
            messages.len(),
            result.modules
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::HostResources;
    use crate::types::{Diagnostic, Location};
    use parking_lot::Mutex;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const GB: u64 = 1000 * 1000 * 1000;

    /// Writes `<Name>.tpl` into the job's bin for every module and records the job
    #[derive(Default)]
    struct FakeInvoker {
        jobs: Mutex<Vec<WorkerJob>>,
        pre_check_done: AtomicBool,
        chunk_saw_pre_check: Mutex<Vec<bool>>,
        fail_on: Option<&'static str>,
        panic_on: Option<&'static str>,
    }

    impl WorkerInvoker for FakeInvoker {
        fn invoke(&self, job: &WorkerJob) -> Result<WorkerResult> {
            self.jobs.lock().push(job.clone());

            if job.role == WorkerRole::PreCheck {
                thread::sleep(Duration::from_millis(50));
            }
            if let WorkerRole::Chunk(_) = job.role {
                self.chunk_saw_pre_check
                    .lock()
                    .push(self.pre_check_done.load(Ordering::SeqCst));
            }

            let stems: Vec<String> = job
                .modules
                .iter()
                .flat_map(WorkSet::items)
                .map(|item| item.path().file_stem().unwrap().to_string_lossy().to_string())
                .collect();
            for stem in &stems {
                if Some(stem.as_str()) == self.panic_on {
                    panic!("checker crashed on {stem}");
                }
                if Some(stem.as_str()) == self.fail_on {
                    return Err(Error::Other(format!("cannot check {stem}")));
                }
            }

            let mut diagnostics = Vec::new();
            for (stem, item) in stems.iter().zip(job.modules.iter().flat_map(WorkSet::items)) {
                fs::create_dir_all(&job.paths.bin)?;
                fs::write(job.paths.bin.join(format!("{stem}.tpl")), stem)?;
                diagnostics.push(Diagnostic::warning(
                    Location::at(item.path(), 1, 1),
                    format!("checked {stem}"),
                ));
            }

            if job.role == WorkerRole::PreCheck {
                self.pre_check_done.store(true, Ordering::SeqCst);
            }
            Ok(WorkerResult::messages(job, diagnostics))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn estimator(cores: usize) -> Arc<ResourceEstimator> {
        Arc::new(ResourceEstimator::with_host(HostResources::new(cores, 64 * GB)))
    }

    fn modules(count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| WorkItem::new(format!("/p/src/M{i:03}.rsc")))
            .collect()
    }

    fn paths(root: &Path) -> PathConfig {
        PathConfig::new(
            vec![PathBuf::from("/p/src")],
            root.join("bin"),
            root.join("generated"),
        )
    }

    fn parallel(max: usize) -> OrchestratorOptions {
        OrchestratorOptions {
            parallel: true,
            parallel_max: max,
            ..Default::default()
        }
    }

    fn artifacts(bin: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(bin)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_small_batch_runs_serially() {
        let temp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(FakeInvoker::default(), estimator(8)).with_options(parallel(4));

        let batch = Batch::new(paths(temp.path()), modules(10), &[]);
        let outcome = orchestrator.run(&batch).unwrap();

        let jobs = orchestrator.invoker().jobs.lock();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].role, WorkerRole::Serial);
        assert_eq!(jobs[0].module_count(), 10);
        assert_eq!(outcome.aggregate.diagnostics.len(), 10);
        assert!(outcome.passed());
    }

    #[test]
    fn test_single_worker_bypasses_partitioning() {
        let temp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(FakeInvoker::default(), estimator(1)).with_options(parallel(4));

        let batch = Batch::new(paths(temp.path()), modules(150), &[]);
        orchestrator.run(&batch).unwrap();

        let jobs = orchestrator.invoker().jobs.lock();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].module_count(), 150);
        assert_eq!(jobs[0].paths.bin, temp.path().join("bin"));
        assert_eq!(artifacts(&temp.path().join("bin")).len(), 150);
    }

    #[test]
    fn test_serial_run_includes_pre_checks() {
        let temp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(FakeInvoker::default(), estimator(8));

        let todo = modules(4);
        let batch = Batch::new(paths(temp.path()), todo.clone(), &todo[..1]);
        orchestrator.run(&batch).unwrap();

        let jobs = orchestrator.invoker().jobs.lock();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].module_count(), 4);
    }

    #[test]
    fn test_parallel_run_waits_for_pre_check() {
        let temp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(FakeInvoker::default(), estimator(8)).with_options(parallel(3));

        let todo = modules(31);
        let batch = Batch::new(paths(temp.path()), todo.clone(), &todo[..1]);
        let outcome = orchestrator.run(&batch).unwrap();

        let invoker = orchestrator.invoker();
        let jobs = invoker.jobs.lock();
        assert_eq!(jobs.len(), 4);
        assert!(invoker.chunk_saw_pre_check.lock().iter().all(|saw| *saw));

        let pre = jobs.iter().find(|j| j.role == WorkerRole::PreCheck).unwrap();
        let chunk = jobs.iter().find(|j| j.role == WorkerRole::Chunk(0)).unwrap();
        assert!(chunk.paths.libs.contains(&pre.paths.bin));
        assert!(chunk.paths.libs.contains(&temp.path().join("bin")));
        assert_ne!(chunk.paths.bin, temp.path().join("bin"));
        assert_eq!(chunk.concurrency, 4);
        assert_eq!(chunk.console, ConsoleMode::Inherit);
        let last = jobs.iter().find(|j| j.role == WorkerRole::Chunk(2)).unwrap();
        assert_eq!(last.console, ConsoleMode::Capture);

        let workers: Vec<usize> = outcome.results.iter().map(|r| r.worker).collect();
        assert_eq!(workers, vec![0, 1, 2, 3]);
        assert_eq!(outcome.aggregate.diagnostics.len(), 31);
        assert_eq!(artifacts(&temp.path().join("bin")).len(), 31);
        assert!(!pre.paths.bin.exists());
    }

    #[test]
    fn test_parallel_output_matches_serial_output() {
        let serial_root = tempfile::tempdir().unwrap();
        let parallel_root = tempfile::tempdir().unwrap();
        let todo = modules(23);

        Orchestrator::new(FakeInvoker::default(), estimator(8))
            .run(&Batch::new(paths(serial_root.path()), todo.clone(), &[]))
            .unwrap();
        Orchestrator::new(FakeInvoker::default(), estimator(8))
            .with_options(parallel(4))
            .run(&Batch::new(paths(parallel_root.path()), todo, &[]))
            .unwrap();

        let serial_bin = serial_root.path().join("bin");
        let parallel_bin = parallel_root.path().join("bin");
        assert_eq!(artifacts(&serial_bin), artifacts(&parallel_bin));
        for name in artifacts(&serial_bin) {
            assert_eq!(
                fs::read(serial_bin.join(&name)).unwrap(),
                fs::read(parallel_bin.join(&name)).unwrap()
            );
        }
    }

    #[test]
    fn test_failure_is_raised_after_merge() {
        let temp = tempfile::tempdir().unwrap();
        let invoker = FakeInvoker {
            fail_on: Some("M020"),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(invoker, estimator(8)).with_options(parallel(2));

        let err = orchestrator
            .run(&Batch::new(paths(temp.path()), modules(30), &[]))
            .unwrap_err();

        assert!(matches!(err, Error::WorkerFailed { worker: 1, .. }));
        // the first chunk finished and its artifacts were kept
        assert_eq!(artifacts(&temp.path().join("bin")).len(), 15);
    }

    #[test]
    fn test_panicking_worker_does_not_stop_the_others() {
        let temp = tempfile::tempdir().unwrap();
        let invoker = FakeInvoker {
            panic_on: Some("M000"),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(invoker, estimator(8)).with_options(parallel(2));

        let err = orchestrator
            .run(&Batch::new(paths(temp.path()), modules(30), &[]))
            .unwrap_err();

        match err {
            Error::WorkerPanicked { worker, message } => {
                assert_eq!(worker, 0);
                assert!(message.contains("M000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(orchestrator.invoker().jobs.lock().len(), 2);
        assert_eq!(artifacts(&temp.path().join("bin")).len(), 15);
    }

    #[test]
    fn test_empty_batch_passes_without_workers() {
        let temp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(FakeInvoker::default(), estimator(8));

        let outcome = orchestrator
            .run(&Batch::new(paths(temp.path()), Vec::new(), &[]))
            .unwrap();

        assert!(outcome.passed());
        assert!(outcome.results.is_empty());
        assert!(orchestrator.invoker().jobs.lock().is_empty());
    }

    #[test]
    fn test_batch_keeps_only_stale_pre_checks() {
        let todo = modules(3);
        let pre = vec![todo[0].clone(), WorkItem::new("/p/src/Fresh.rsc")];
        let batch = Batch::new(PathConfig::default(), todo, &pre);

        assert_eq!(batch.pre_checks, vec![WorkItem::new("/p/src/M000.rsc")]);
        assert_eq!(batch.remainder(), 2);
    }

    #[test]
    fn test_pre_checks_match_however_they_are_spelled() {
        let todo = vec![WorkItem::new("/p/src/A.rsc"), WorkItem::new("/p/src/B.rsc")];
        let pre = vec![
            WorkItem::new("/p/src/lang/../A.rsc"),
            WorkItem::new("/p/src/./A.rsc"),
        ];
        let batch = Batch::new(PathConfig::default(), todo, &pre);

        assert_eq!(batch.pre_checks.len(), 1);
        assert_eq!(batch.pre_checks[0].path(), Path::new("/p/src/A.rsc"));
        assert_eq!(batch.remainder(), 1);
    }
}
