use super::compiler_command::{CompilerCommand, join_paths};
use super::launcher::Launcher;
use crate::types::PathConfig;

/// Renders a [`PathConfig`] into a command line for a [`Launcher`].
///
/// Batch tools receive the whole path configuration as flags:
/// `-srcs -ignores -libs -bin -generatedSources`, then every extra parameter
/// as `-<key> <value>`, then `-verbose`. The shell only gets its main module.
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    launcher: &'a Launcher,
    heap_kib: Option<u64>,
    verbose: bool,
    main_module: Option<String>,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(launcher: &'a Launcher) -> Self {
        Self {
            launcher,
            heap_kib: None,
            verbose: false,
            main_module: None,
        }
    }

    /// Heap ceiling for JVM launches, in KiB
    pub fn with_heap_kib(mut self, heap_kib: u64) -> Self {
        self.heap_kib = Some(heap_kib);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_main_module(mut self, module: Option<String>) -> Self {
        self.main_module = module.filter(|m| !m.is_empty());
        self
    }

    pub fn build(&self, pcfg: &PathConfig) -> CompilerCommand {
        let mut args = Vec::new();

        if let Launcher::Jvm {
            classpath,
            main_class,
            system_properties,
            ..
        } = self.launcher
        {
            for (key, value) in system_properties {
                args.push(format!("-D{key}={value}"));
            }
            if let Some(heap) = self.heap_kib {
                args.push(format!("-Xmx{heap}k"));
            }
            args.push("-cp".to_string());
            args.push(join_paths(classpath));
            args.push(main_class.clone());
        }

        if self.launcher.is_shell() {
            if let Some(ref module) = self.main_module {
                args.push(module.clone());
            }
        } else {
            push_list(&mut args, "-srcs", &pcfg.srcs);
            push_list(&mut args, "-ignores", &pcfg.ignores);
            push_list(&mut args, "-libs", &pcfg.libs);

            args.push("-bin".to_string());
            args.push(pcfg.bin.display().to_string());
            args.push("-generatedSources".to_string());
            args.push(pcfg.generated_sources.display().to_string());

            for (key, value) in &pcfg.extra {
                args.push(format!("-{key}"));
                args.push(value.clone());
            }

            if self.verbose {
                args.push("-verbose".to_string());
            }
        }

        CompilerCommand::new(self.launcher.program().clone(), args)
    }
}

fn push_list(args: &mut Vec<String>, flag: &str, paths: &[std::path::PathBuf]) {
    if !paths.is_empty() {
        args.push(flag.to_string());
        args.push(join_paths(paths));
    }
}
