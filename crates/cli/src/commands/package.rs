use anyhow::Result;
use rascal_build_core::goals;

use super::{Invocation, load_context, log_outcome};
use crate::cli::PathArgs;
use crate::display::print_command_breakdown;

pub fn package_command(inv: &Invocation<'_>, paths: &PathArgs, dry_run: bool) -> Result<()> {
    let ctx = load_context(inv, paths.overrides(inv.cwd))?;

    if dry_run {
        let command = goals::package::package_command(&ctx)?;
        println!("{}", command.to_shell_command());
        print_command_breakdown(&command);
        return Ok(());
    }

    let outcome = goals::package(&ctx)?;
    log_outcome("package", &outcome);
    Ok(())
}
