use super::{GoalContext, SHELL_MAIN_CLASS};
use crate::{
    command::{CompilerCommand, Launcher, join_paths},
    config::{ConfigValidator, GoalValidator},
    error::Result,
};
use tracing::info;

/// The command that starts an interactive console for the project.
///
/// The classpath holds the runtime jar (when configured) followed by every
/// library the project depends on. Nothing is started; the caller decides
/// whether to print or run it.
pub fn console_command(ctx: &GoalContext) -> Result<CompilerCommand> {
    GoalValidator::console().validate(&ctx.config)?;
    let config = &ctx.config;

    if let Some(executable) = &config.launcher.executable {
        return Ok(CompilerCommand::new(config.resolve(executable), Vec::new()));
    }

    let pcfg = ctx.configured_paths()?;
    let mut classpath = Vec::new();
    if let Some(runtime) = &config.launcher.runtime_jar {
        classpath.push(config.resolve(runtime));
    }
    classpath.extend(config.launcher.extra_classpath.iter().map(|p| config.resolve(p)));
    for lib in pcfg.libs {
        if !classpath.contains(&lib) {
            classpath.push(lib);
        }
    }

    let java = config.launcher.java.clone().unwrap_or_else(Launcher::default_java);
    let command = CompilerCommand::new(
        java,
        vec![
            "-cp".to_string(),
            join_paths(&classpath),
            SHELL_MAIN_CLASS.to_string(),
        ],
    )
    .with_working_dir(config.base_dir());

    info!("{}", command.to_shell_command());
    Ok(command)
}
