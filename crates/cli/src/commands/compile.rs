use anyhow::Result;
use rascal_build_core::{
    goals::{self, compile::dry_run},
    scanner::StaleSourceScanner,
};
use tracing::info;

use super::{Invocation, load_context, log_outcome};
use crate::cli::{CheckArgs, PathArgs};
use crate::display::print_command_breakdown;
use std::path::PathBuf;

pub struct CompileArgs<'a> {
    pub paths: &'a PathArgs,
    pub check: CheckArgs,
    pub parallel: bool,
    pub parallel_max: Option<usize>,
    pub pre_checks: &'a [PathBuf],
    pub dry_run: bool,
}

pub fn compile_command(inv: &Invocation<'_>, args: CompileArgs<'_>) -> Result<()> {
    let cwd = inv.cwd;
    let mut overrides = args.paths.overrides(cwd);
    args.check.apply(&mut overrides);
    overrides.parallel = args.parallel.then_some(true);
    overrides.parallel_max = args.parallel_max;
    overrides.pre_checks = args.pre_checks.iter().map(|p| cwd.join(p)).collect();

    let ctx = load_context(inv, overrides)?;

    if args.dry_run {
        match dry_run(&ctx, &StaleSourceScanner::default())? {
            Some(command) => {
                println!("{}", command.to_shell_command());
                print_command_breakdown(&command);
            }
            None => info!("Nothing to compile"),
        }
        return Ok(());
    }

    let outcome = goals::compile(&ctx)?;
    log_outcome("compile", &outcome);
    Ok(())
}
