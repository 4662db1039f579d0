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

/// Packages the compiled library, rewriting source locations to `sourceLookup`
pub fn package(ctx: &GoalContext) -> Result<GoalOutcome> {
    if Goal::Package.is_skipped() {
        info!("Skipping {} completely", Goal::Package);
        return Ok(GoalOutcome::Skipped);
    }

    let (invoker, pcfg) = prepare(ctx)?;
    run_whole_project(ctx, Goal::Package, invoker, &pcfg)
}

pub fn package_command(ctx: &GoalContext) -> Result<CompilerCommand> {
    let (invoker, pcfg) = prepare(ctx)?;
    Ok(whole_project_command(&invoker, &pcfg))
}

fn prepare(ctx: &GoalContext) -> Result<(ProcessInvoker, PathConfig)> {
    GoalValidator::whole_project().validate(&ctx.config)?;

    let pcfg = ctx.configured_paths()?;
    let parameters = BTreeMap::from([("sourceLookup".to_string(), ctx.config.source_lookup())]);
    let invoker = ctx.process_invoker(Goal::Package, parameters)?;
    Ok((invoker, pcfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    #[test]
    fn test_package_command_carries_source_lookup() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("src/main/rascal")).unwrap();

        let mut config = Config {
            root: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        config.project.group = Some("org.example".to_string());
        config.project.name = Some("demo".to_string());
        config.project.version = Some("1.2.0".to_string());
        config.launcher.executable = Some(PathBuf::from("/usr/bin/rascal-package"));

        let command = package_command(&GoalContext::new(config)).unwrap();

        assert_eq!(
            command.flag_value("-sourceLookup"),
            Some("|mvn://org.example--demo--1.2.0/|")
        );
        assert_eq!(
            command.flag_value("-bin"),
            Some(temp.path().join("target/classes").to_str().unwrap())
        );
    }
}
