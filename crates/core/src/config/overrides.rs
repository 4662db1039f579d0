use super::Config;
use std::path::PathBuf;

/// Values given on the command line, which take precedence over the config file.
///
/// List values replace the configured list when non-empty, except libraries,
/// which are appended.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub srcs: Vec<PathBuf>,
    pub ignores: Vec<PathBuf>,
    pub libs: Vec<PathBuf>,
    pub bin: Option<PathBuf>,
    pub generated_sources: Option<PathBuf>,
    pub parallel: Option<bool>,
    pub parallel_max: Option<usize>,
    pub pre_checks: Vec<PathBuf>,
    pub errors_as_warnings: bool,
    pub warnings_as_errors: bool,
    pub verbose: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if !self.srcs.is_empty() {
            config.paths.srcs = self.srcs.clone();
        }
        if !self.ignores.is_empty() {
            config.paths.ignores = self.ignores.clone();
        }
        config.paths.libs.extend(self.libs.iter().cloned());
        if let Some(bin) = &self.bin {
            config.paths.bin = Some(bin.clone());
        }
        if let Some(generated) = &self.generated_sources {
            config.paths.generated_sources = Some(generated.clone());
        }

        if let Some(parallel) = self.parallel {
            config.compile.parallel = parallel;
        }
        if let Some(max) = self.parallel_max {
            config.compile.parallel_max = max;
        }
        if !self.pre_checks.is_empty() {
            config.compile.parallel_pre_checks = self.pre_checks.clone();
        }

        if self.errors_as_warnings {
            config.compile.errors_as_warnings = true;
            config.tutor.errors_as_warnings = true;
        }
        if self.warnings_as_errors {
            config.compile.warnings_as_errors = true;
            config.tutor.warnings_as_errors = true;
        }
        config.verbose |= self.verbose;
    }
}
