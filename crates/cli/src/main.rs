use anyhow::{Context, Result};
use clap::Parser;
use rascal_build::{
    Cli, Commands,
    commands::{
        Invocation, cancel_on_shutdown, compile::CompileArgs, compile_command, console_command, generate_command,
        package_command, tutor_command,
    },
};
use rascal_build_core::worker::CancellationToken;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let inv = Invocation {
        config_file: cli.config.as_deref(),
        cwd: &cwd,
        verbose: cli.verbose,
        cancel: CancellationToken::new(),
    };
    // the interactive shell handles Ctrl-C itself
    if !matches!(cli.command, Commands::Console { .. }) {
        cancel_on_shutdown(&inv.cancel)?;
    }

    match &cli.command {
        Commands::Compile {
            paths,
            check,
            parallel,
            parallel_max,
            pre_checks,
            dry_run,
        } => compile_command(
            &inv,
            CompileArgs {
                paths,
                check: *check,
                parallel: *parallel,
                parallel_max: *parallel_max,
                pre_checks,
                dry_run: *dry_run,
            },
        ),
        Commands::Tutor { paths, check, dry_run } => tutor_command(&inv, paths, *check, *dry_run),
        Commands::Package { paths, dry_run } => package_command(&inv, paths, *dry_run),
        Commands::GenerateSources {
            paths,
            generated_sources,
            dry_run,
        } => generate_command(&inv, paths, generated_sources.as_ref(), *dry_run),
        Commands::Console { paths, exec } => console_command(&inv, paths, *exec),
    }
}
