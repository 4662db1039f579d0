use clap::{Args, Parser, Subcommand};
use rascal_build_core::config::Overrides;
use std::path::{Path, PathBuf};

/// Checks, documents and packages Rascal projects
#[derive(Parser, Debug)]
#[command(name = "rascal-build", version, about, long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug              Enable debug logging\n    RASCAL_<GOAL>_SKIP=true     Skip a goal (COMPILE, TUTOR, PACKAGE, GENERATE)")]
pub struct Cli {
    /// Config file to use instead of the nearest .rascal-build.json
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output and pass -verbose to the tool
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every stale module, in parallel when the project is large enough
    Compile {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        check: CheckArgs,

        /// Use more than one worker when the batch is large enough
        #[arg(long = "parallel")]
        parallel: bool,

        /// Upper bound on the number of workers
        #[arg(long = "parallel-max", value_name = "N")]
        parallel_max: Option<usize>,

        /// Module to check before the parallel workers start (repeatable)
        #[arg(long = "pre-check", value_name = "FILE")]
        pre_checks: Vec<PathBuf>,

        /// Show the checker command without running it
        #[arg(short = 'd', long = "dry-run")]
        dry_run: bool,
    },
    /// Compile the tutor documentation of the project
    Tutor {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        check: CheckArgs,

        #[arg(short = 'd', long = "dry-run")]
        dry_run: bool,
    },
    /// Rewrite source locations for the packaged jar
    Package {
        #[command(flatten)]
        paths: PathArgs,

        #[arg(short = 'd', long = "dry-run")]
        dry_run: bool,
    },
    /// Run the project's source generator module
    #[command(name = "generate-sources")]
    GenerateSources {
        #[command(flatten)]
        paths: PathArgs,

        /// Generated sources directory
        #[arg(long = "generated-sources", value_name = "DIR")]
        generated_sources: Option<PathBuf>,

        #[arg(short = 'd', long = "dry-run")]
        dry_run: bool,
    },
    /// Start an interactive shell with the project on its path
    Console {
        #[command(flatten)]
        paths: PathArgs,

        /// Start the shell instead of printing its command
        #[arg(long = "exec")]
        exec: bool,
    },
}

/// Project layout flags shared by every goal
#[derive(Args, Debug, Default, Clone)]
pub struct PathArgs {
    /// Source root (repeatable, replaces the configured roots)
    #[arg(long = "src", value_name = "DIR")]
    pub srcs: Vec<PathBuf>,

    /// Library location (repeatable, added to the configured libraries)
    #[arg(long = "lib", value_name = "PATH")]
    pub libs: Vec<PathBuf>,

    /// Directory whose sources are not checked (repeatable)
    #[arg(long = "ignore", value_name = "DIR")]
    pub ignores: Vec<PathBuf>,

    /// Output directory for compiled artifacts
    #[arg(long = "bin", value_name = "DIR")]
    pub bin: Option<PathBuf>,
}

/// Severity flags shared by the checking goals
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct CheckArgs {
    /// Report errors but never fail the goal
    #[arg(long = "errors-as-warnings")]
    pub errors_as_warnings: bool,

    /// Fail the goal on warnings too
    #[arg(long = "warnings-as-errors", conflicts_with = "errors_as_warnings")]
    pub warnings_as_errors: bool,
}

impl PathArgs {
    /// Overrides with every path made absolute against `cwd`
    pub fn overrides(&self, cwd: &Path) -> Overrides {
        Overrides {
            srcs: absolutize(cwd, &self.srcs),
            ignores: absolutize(cwd, &self.ignores),
            libs: absolutize(cwd, &self.libs),
            bin: self.bin.as_ref().map(|bin| cwd.join(bin)),
            ..Default::default()
        }
    }
}

impl CheckArgs {
    pub fn apply(self, overrides: &mut Overrides) {
        overrides.errors_as_warnings = self.errors_as_warnings;
        overrides.warnings_as_errors = self.warnings_as_errors;
    }
}

fn absolutize(cwd: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().map(|p| cwd.join(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compile_flags() {
        let cli = Cli::parse_from([
            "rascal-build",
            "--verbose",
            "compile",
            "--src",
            "src/main/rascal",
            "--lib",
            "/opt/rascal.jar",
            "--parallel",
            "--parallel-max",
            "3",
            "--pre-check",
            "src/main/rascal/Prelude.rsc",
            "--errors-as-warnings",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Compile {
                paths,
                check,
                parallel,
                parallel_max,
                pre_checks,
                dry_run,
            } => {
                assert!(parallel);
                assert!(!dry_run);
                assert_eq!(parallel_max, Some(3));
                assert_eq!(pre_checks, vec![PathBuf::from("src/main/rascal/Prelude.rsc")]);
                assert!(check.errors_as_warnings);

                let overrides = paths.overrides(Path::new("/work"));
                assert_eq!(overrides.srcs, vec![PathBuf::from("/work/src/main/rascal")]);
                assert_eq!(overrides.libs, vec![PathBuf::from("/opt/rascal.jar")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_severity_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "rascal-build",
            "tutor",
            "--errors-as-warnings",
            "--warnings-as-errors",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_generate_sources_name() {
        let cli = Cli::parse_from(["rascal-build", "generate-sources", "--dry-run"]);
        assert!(matches!(cli.command, Commands::GenerateSources { dry_run: true, .. }));
    }
}
