use anyhow::Result;
use rascal_build_core::goals;
use std::path::PathBuf;

use super::{Invocation, load_context, log_outcome};
use crate::cli::PathArgs;
use crate::display::print_command_breakdown;

pub fn generate_command(inv: &Invocation<'_>, paths: &PathArgs, generated_sources: Option<&PathBuf>, dry_run: bool) -> Result<()> {
    let mut overrides = paths.overrides(inv.cwd);
    overrides.generated_sources = generated_sources.map(|dir| inv.cwd.join(dir));
    let ctx = load_context(inv, overrides)?;

    if dry_run {
        let command = goals::generate_sources::generate_sources_command(&ctx)?;
        println!("{}", command.to_shell_command());
        print_command_breakdown(&command);
        return Ok(());
    }

    let outcome = goals::generate_sources(&ctx)?;
    log_outcome("generate-sources", &outcome);
    Ok(())
}
