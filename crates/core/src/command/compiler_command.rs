use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::error;

/// Joins paths with the platform's search-path separator.
///
/// Entries that contain the separator themselves cannot be represented in
/// such a list; they are logged and left out.
pub fn join_paths<P: AsRef<Path>>(paths: &[P]) -> String {
    let joinable = paths.iter().map(|p| -> &Path { p.as_ref() }).filter(|path| {
        let ok = env::join_paths([*path]).is_ok();
        if !ok {
            error!("{} contains the path separator, leaving it out", path.display());
        }
        ok
    });
    env::join_paths(joinable)
        .map(|joined| joined.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A fully rendered tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CompilerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Value following `flag` in the argument list
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Single-line rendering for logs and `--dry-run`
    pub fn to_shell_command(&self) -> String {
        let mut cmd = quote(&self.program.display().to_string());
        for arg in &self.args {
            cmd.push(' ');
            cmd.push_str(&quote(arg));
        }
        cmd
    }

    /// A `std::process::Command` ready to be configured and spawned
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        cmd
    }

    /// Runs the command attached to the current console and waits for it
    pub fn execute(&self) -> io::Result<ExitStatus> {
        self.to_command().status()
    }
}

fn quote(arg: &str) -> String {
    let escaped = arg.replace('\n', "\\n");
    if escaped.is_empty() || escaped.contains([' ', '\'', '"', '$', ';', '|', '&']) {
        format!("'{}'", escaped.replace('\'', "'\\''"))
    } else {
        escaped
    }
}
