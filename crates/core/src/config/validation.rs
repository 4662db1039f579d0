//! Configuration validation, run before any worker starts

use crate::{
    config::Config,
    error::{Error, Result},
};
use tracing::warn;

/// Trait for validating configurations
pub trait ConfigValidator {
    /// Validate the entire configuration
    fn validate(&self, config: &Config) -> Result<()>;
}

/// Checks the parts of a configuration that one goal depends on.
///
/// Every problem is collected before failing, so that one run reports all of them.
#[derive(Debug, Clone, Copy)]
pub struct GoalValidator {
    check_compile: bool,
    needs_launcher: bool,
}

impl GoalValidator {
    /// Rules for the compile goal, including parallelism and pre-checks
    pub fn compile() -> Self {
        Self {
            check_compile: true,
            needs_launcher: true,
        }
    }

    /// Rules for compiling with an embedded evaluator, which needs no launcher
    pub fn in_process() -> Self {
        Self {
            check_compile: true,
            needs_launcher: false,
        }
    }

    /// Rules for goals that run the tool once over the whole project
    pub fn whole_project() -> Self {
        Self {
            check_compile: false,
            needs_launcher: true,
        }
    }

    /// Rules for the console goal, which can fall back to printing a partial command
    pub fn console() -> Self {
        Self {
            check_compile: false,
            needs_launcher: false,
        }
    }
}

impl ConfigValidator for GoalValidator {
    fn validate(&self, config: &Config) -> Result<()> {
        let mut problems = Vec::new();
        let pcfg = config.path_config();

        if pcfg.srcs.is_empty() {
            problems.push("no source roots configured".to_string());
        }
        for src in &pcfg.srcs {
            if !src.is_dir() {
                problems.push(format!("source root {} does not exist", src.display()));
            }
        }
        for ignore in &pcfg.ignores {
            if pcfg.source_root_of(ignore).is_none() {
                warn!("Ignore root {} is outside every source root", ignore.display());
            }
        }

        if self.check_compile {
            if config.compile.parallel_max == 0 {
                problems.push("parallel_max must be at least 1".to_string());
            }
            for pre_check in config.pre_checks() {
                if pcfg.source_root_of(pre_check.path()).is_none() {
                    problems.push(format!(
                        "pre-check module {} is outside every source root",
                        pre_check
                    ));
                }
            }
        }

        if self.needs_launcher
            && config.launcher.executable.is_none()
            && config.launcher.runtime_jar.is_none()
        {
            problems.push("no launcher configured: set launcher.runtime_jar or launcher.executable".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigError(problems.join("; ")))
        }
    }
}
