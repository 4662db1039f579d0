use anyhow::Result;
use rascal_build_core::goals;

use super::{Invocation, load_context, log_outcome};
use crate::cli::{CheckArgs, PathArgs};
use crate::display::print_command_breakdown;

pub fn tutor_command(inv: &Invocation<'_>, paths: &PathArgs, check: CheckArgs, dry_run: bool) -> Result<()> {
    let mut overrides = paths.overrides(inv.cwd);
    check.apply(&mut overrides);
    let ctx = load_context(inv, overrides)?;

    if dry_run {
        let command = goals::tutor::tutor_command(&ctx)?;
        println!("{}", command.to_shell_command());
        print_command_breakdown(&command);
        return Ok(());
    }

    let outcome = goals::tutor(&ctx)?;
    log_outcome("tutor", &outcome);
    Ok(())
}
