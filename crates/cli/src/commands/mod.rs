pub mod compile;
pub mod console;
pub mod generate;
pub mod package;
pub mod tutor;

pub use compile::compile_command;
pub use console::console_command;
pub use generate::generate_command;
pub use package::package_command;
pub use tutor::tutor_command;

use anyhow::{Context, Result};
use rascal_build_core::{Config, GoalContext, GoalOutcome, config::Overrides, worker::CancellationToken};
use std::path::Path;
use tracing::{debug, info, warn};

/// What every command gets from the global flags and the process
pub struct Invocation<'a> {
    pub config_file: Option<&'a Path>,
    pub cwd: &'a Path,
    pub verbose: bool,
    /// Set when the process is asked to terminate
    pub cancel: CancellationToken,
}

/// Cancels `token` on Ctrl-C or SIGTERM, so that running workers are killed
/// instead of being left behind. A second signal exits at once.
pub fn cancel_on_shutdown(token: &CancellationToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        warn!("Shutting down, stopping every worker");
        token.cancel();
    })
    .context("Failed to install the shutdown handler")
}

/// Loads the project config, applies the command line on top and builds the
/// context every goal runs in
pub fn load_context(inv: &Invocation<'_>, mut overrides: Overrides) -> Result<GoalContext> {
    let cwd = inv.cwd;
    let mut config = match inv.config_file {
        Some(path) => {
            let path = cwd.join(path);
            Config::load_from_file(&path).with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::discover(cwd).context("Failed to load project config")?,
    };

    overrides.verbose = inv.verbose;
    overrides.apply(&mut config);
    debug!("Effective config: {:?}", config);

    Ok(GoalContext::new(config).with_cancellation(inv.cancel.clone()))
}

/// Logs how a goal that did not fail ended
pub fn log_outcome(goal: &str, outcome: &GoalOutcome) {
    match outcome {
        GoalOutcome::Skipped => info!("{goal} skipped"),
        GoalOutcome::UpToDate => info!("{goal}: everything is up to date"),
        GoalOutcome::Checked(report) => {
            let verdict = report.outcome.aggregate.verdict;
            info!(
                "{goal} finished: {} modules in {} workers, {} errors",
                report.outcome.results.iter().map(|r| r.modules).sum::<usize>(),
                report.outcome.results.len(),
                verdict.error_count
            );
        }
        GoalOutcome::Finished(_) => info!("{goal} finished"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_shares_the_shutdown_token() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation {
            config_file: None,
            cwd: dir.path(),
            verbose: false,
            cancel: CancellationToken::new(),
        };

        let ctx = load_context(&inv, Overrides::default()).unwrap();
        assert!(!ctx.cancel.is_cancelled());

        inv.cancel.cancel();
        assert!(ctx.cancel.is_cancelled());
    }
}
