//! Process-backed workers: the checker runs as a child process

use super::{CancellationToken, ConsoleMode, WorkerInvoker, WorkerJob, WorkerResult};
use crate::{
    command::{CommandBuilder, CompilerCommand, Launcher, join_paths},
    error::{Error, Result},
    resources::ResourceEstimator,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Exit code of a process killed by the OS, usually for using too much memory
pub const KILLED_BY_OS: i32 = 137;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Spawns the tool once per job and waits for its exit code
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    launcher: Launcher,
    estimator: Arc<ResourceEstimator>,
    parameters: BTreeMap<String, String>,
    verbose: bool,
    main_module: Option<String>,
    cancel: CancellationToken,
}

impl ProcessInvoker {
    pub fn new(launcher: Launcher, estimator: Arc<ResourceEstimator>) -> Self {
        Self {
            launcher,
            estimator,
            parameters: BTreeMap::new(),
            verbose: false,
            main_module: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Tool parameters added to every job, next to the job's own extras
    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_main_module(mut self, module: Option<String>) -> Self {
        self.main_module = module;
        self
    }

    /// Appends jars to the classpath of JVM launches
    pub fn with_extra_classpath(mut self, extra: &[PathBuf]) -> Self {
        self.launcher = self.launcher.with_extra_classpath(extra);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The command line a job would be started with
    pub fn command_for(&self, job: &WorkerJob) -> CompilerCommand {
        let mut paths = job.paths.clone();
        for (key, value) in &self.parameters {
            paths.extra.insert(key.clone(), value.clone());
        }
        if let Some(ref modules) = job.modules {
            paths
                .extra
                .insert("modules".to_string(), join_paths(modules.items()));
        }

        CommandBuilder::new(&self.launcher)
            .with_heap_kib(self.estimator.heap_ceiling_kib(job.concurrency))
            .with_verbose(self.verbose)
            .with_main_module(self.main_module.clone())
            .build(&paths)
    }

    fn spawn(command: &CompilerCommand, console: ConsoleMode) -> Result<(Child, Option<os_pipe::PipeReader>)> {
        let mut cmd = command.to_command();

        match console {
            ConsoleMode::Inherit => Ok((cmd.spawn()?, None)),
            ConsoleMode::Capture => {
                // stderr goes to stdout as well
                let (reader, writer) = os_pipe::pipe()?;
                cmd.stdin(Stdio::null());
                cmd.stdout(writer.try_clone()?);
                cmd.stderr(writer);
                let child = cmd.spawn()?;
                // the command holds the write ends; the reader only sees EOF once they are gone
                drop(cmd);
                Ok((child, Some(reader)))
            }
        }
    }

    fn wait(&self, child: &mut ChildGuard) -> Result<ExitStatus> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if self.cancel.is_cancelled() {
                child.kill();
                return Err(Error::Cancelled);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl WorkerInvoker for ProcessInvoker {
    fn invoke(&self, job: &WorkerJob) -> Result<WorkerResult> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let command = self.command_for(job);
        debug!("Exec: {}", command.program.display());
        debug!("Starting process:\n\t{}", command.to_shell_command());

        let (child, reader) = Self::spawn(&command, job.console)?;
        let mut child = ChildGuard::new(child);
        let drain = reader.map(drain_output);

        let status = self.wait(&mut child);
        let captured = match drain {
            Some(handle) => Some(
                handle
                    .join()
                    .map_err(|_| Error::Other("output reader panicked".to_string()))??,
            ),
            None => None,
        };

        let code = exit_code(&status?);
        if code == KILLED_BY_OS {
            error!(
                "{} (worker {}) was killed by the OS; possibly for taking too much memory",
                job.role, job.id
            );
        }

        Ok(WorkerResult::exit(job, code, captured))
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Reads a worker's merged output on its own thread so the pipe never fills up
fn drain_output(mut reader: os_pipe::PipeReader) -> JoinHandle<Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::with_capacity(8 * 1024);
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

/// Exit code of a finished process; signals map to `128 + signal` like a shell does
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Owns a child process and kills it if dropped before it was reaped
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        self.reaped = status.is_some();
        Ok(status)
    }

    fn kill(&mut self) {
        if self.reaped {
            return;
        }
        debug!("Killing process {}", self.child.id());
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::resources::HostResources;
    use crate::types::{PathConfig, WorkItem, WorkSet};
    use crate::worker::{WorkerOutput, WorkerRole};
    use std::path::{Path, PathBuf};
    use std::time::Instant;
    use tempfile::TempDir;

    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tool.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn invoker(executable: PathBuf) -> ProcessInvoker {
        let estimator = ResourceEstimator::with_host(HostResources::new(4, 8_000_000_000));
        ProcessInvoker::new(Launcher::native(executable), Arc::new(estimator))
    }

    fn job(console: ConsoleMode, modules: Option<WorkSet>) -> WorkerJob {
        WorkerJob {
            id: 3,
            role: WorkerRole::Chunk(2),
            modules,
            paths: PathConfig::new(vec![PathBuf::from("/src")], "/bin", "/gen"),
            console,
            concurrency: 2,
        }
    }

    #[test]
    fn test_modules_and_parameters_are_passed_as_flags() {
        let invoker = invoker(PathBuf::from("rascal-check")).with_parameters(BTreeMap::from([(
            "warnUnused".to_string(),
            "true".to_string(),
        )]));
        let modules: WorkSet = [WorkItem::new("/src/A.rsc"), WorkItem::new("/src/B.rsc")]
            .into_iter()
            .collect();

        let cmd = invoker.command_for(&job(ConsoleMode::Inherit, Some(modules)));

        assert_eq!(cmd.flag_value("-modules"), Some("/src/A.rsc:/src/B.rsc"));
        assert_eq!(cmd.flag_value("-warnUnused"), Some("true"));
        assert_eq!(cmd.flag_value("-bin"), Some("/bin"));
    }

    #[test]
    fn test_captures_merged_output_and_exit_code() {
        let temp = TempDir::new().unwrap();
        let tool = script(temp.path(), "echo checking\necho oops >&2\nexit 3");

        let result = invoker(tool).invoke(&job(ConsoleMode::Capture, None)).unwrap();

        assert_eq!(result.worker, 3);
        match result.output {
            WorkerOutput::Exit { code, captured } => {
                assert_eq!(code, 3);
                let text = String::from_utf8(captured.unwrap()).unwrap();
                assert!(text.contains("checking"));
                assert!(text.contains("oops"));
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_killed_process_reports_137() {
        let temp = TempDir::new().unwrap();
        let tool = script(temp.path(), "kill -9 $$");

        let result = invoker(tool).invoke(&job(ConsoleMode::Capture, None)).unwrap();
        assert_eq!(result.exit_code(), Some(KILLED_BY_OS));
    }

    #[test]
    fn test_cancellation_kills_the_child() {
        let temp = TempDir::new().unwrap();
        let tool = script(temp.path(), "exec sleep 30");
        let invoker = invoker(tool);
        let token = invoker.cancellation().clone();

        let started = Instant::now();
        let result = thread::scope(|s| {
            let handle = s.spawn(|| invoker.invoke(&job(ConsoleMode::Capture, None)));
            thread::sleep(Duration::from_millis(100));
            token.cancel();
            handle.join().unwrap()
        });

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_missing_executable_is_an_error() {
        let result = invoker(PathBuf::from("/definitely/not/a/tool")).invoke(&job(ConsoleMode::Inherit, None));
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
