use super::{Goal, GoalContext, GoalOutcome, run_whole_project, whole_project_command};
use crate::{
    command::CompilerCommand,
    config::{ConfigValidator, GoalValidator},
    error::Result,
    types::PathConfig,
    worker::ProcessInvoker,
};
use tracing::info;

/// Compiles the documentation of the project.
///
/// The optional screenshot jar is put on the classpath so that the tutor can
/// render screenshots of interactive examples.
pub fn tutor(ctx: &GoalContext) -> Result<GoalOutcome> {
    if Goal::Tutor.is_skipped() {
        info!("Skipping {} completely", Goal::Tutor);
        return Ok(GoalOutcome::Skipped);
    }

    let (invoker, pcfg) = prepare(ctx)?;
    run_whole_project(ctx, Goal::Tutor, invoker, &pcfg)
}

pub fn tutor_command(ctx: &GoalContext) -> Result<CompilerCommand> {
    let (invoker, pcfg) = prepare(ctx)?;
    Ok(whole_project_command(&invoker, &pcfg))
}

fn prepare(ctx: &GoalContext) -> Result<(ProcessInvoker, PathConfig)> {
    GoalValidator::whole_project().validate(&ctx.config)?;

    let pcfg = ctx.configured_paths()?;
    let mut invoker = ctx.process_invoker(Goal::Tutor, ctx.config.tutor_parameters())?;
    if let Some(jar) = &ctx.config.tutor.screenshotter {
        let jar = ctx.config.resolve(jar);
        invoker = invoker.with_extra_classpath(&[jar]);
    }
    Ok((invoker, pcfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::join_paths;
    use crate::config::Config;
    use std::path::PathBuf;

    #[test]
    fn test_tutor_command() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("src/main/rascal")).unwrap();

        let mut config = Config {
            root: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        config.project.name = Some("typepal".to_string());
        config.launcher.runtime_jar = Some(PathBuf::from("/m2/rascal.jar"));
        config.launcher.java = Some(PathBuf::from("java"));
        config.tutor.screenshotter = Some(PathBuf::from("/m2/screenshot.jar"));

        let command = tutor_command(&GoalContext::new(config)).unwrap();

        let classpath = join_paths(&["/m2/rascal.jar", "/m2/screenshot.jar"]);
        assert_eq!(command.flag_value("-cp"), Some(classpath.as_str()));
        assert!(command.args.iter().any(|a| a == "org.rascalmpl.shell.RascalTutorCompile"));
        assert_eq!(command.flag_value("-packageName"), Some("typepal"));
        assert_eq!(command.flag_value("-isPackageCourse"), Some("true"));
        assert!(command.flag_value("-modules").is_none());
    }
}
