use super::{Goal, GoalContext, GoalOutcome, run_whole_project, whole_project_command};
use crate::{
    command::CompilerCommand,
    config::{ConfigValidator, GoalValidator},
    error::Result,
    types::PathConfig,
    worker::ProcessInvoker,
};
use std::collections::BTreeMap;
use tracing::info;

/// Runs the configured main module in the shell; generating code is expected
/// to be a side effect of running it.
pub fn generate_sources(ctx: &GoalContext) -> Result<GoalOutcome> {
    if Goal::GenerateSources.is_skipped() {
        info!("Skipping {} completely", Goal::GenerateSources);
        return Ok(GoalOutcome::Skipped);
    }

    let (invoker, pcfg) = prepare(ctx)?;
    run_whole_project(ctx, Goal::GenerateSources, invoker, &pcfg)
}

pub fn generate_sources_command(ctx: &GoalContext) -> Result<CompilerCommand> {
    let (invoker, pcfg) = prepare(ctx)?;
    Ok(whole_project_command(&invoker, &pcfg))
}

fn prepare(ctx: &GoalContext) -> Result<(ProcessInvoker, PathConfig)> {
    GoalValidator::whole_project().validate(&ctx.config)?;

    let pcfg = ctx.configured_paths()?;
    let main_module = ctx.config.generate.main_module.clone();
    let invoker = ctx
        .process_invoker(
            Goal::GenerateSources,
            BTreeMap::from([("mainModule".to_string(), main_module.clone())]),
        )?
        .with_main_module(Some(main_module));
    Ok((invoker, pcfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    #[test]
    fn test_shell_only_gets_the_main_module() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("src/main/rascal")).unwrap();

        let mut config = Config {
            root: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        config.launcher.runtime_jar = Some(PathBuf::from("/m2/rascal.jar"));
        config.launcher.java = Some(PathBuf::from("java"));
        config.generate.main_module = "lang::demo::Generate".to_string();

        let command = generate_sources_command(&GoalContext::new(config)).unwrap();

        let tail: Vec<&str> = command.args.iter().rev().take(2).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["org.rascalmpl.shell.RascalShell", "lang::demo::Generate"]);
        assert!(command.flag_value("-srcs").is_none());
    }
}
