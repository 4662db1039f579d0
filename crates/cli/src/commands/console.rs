use anyhow::{Context, Result};
use rascal_build_core::goals;
use tracing::info;

use super::{Invocation, load_context};
use crate::cli::PathArgs;

pub fn console_command(inv: &Invocation<'_>, paths: &PathArgs, exec: bool) -> Result<()> {
    let ctx = load_context(inv, paths.overrides(inv.cwd))?;
    let command = goals::console_command(&ctx)?;

    if !exec {
        println!("{}", command.to_shell_command());
        if let Some(ref dir) = command.working_dir {
            println!("Working directory: {}", dir.display());
        }
        return Ok(());
    }

    let shell_cmd = command.to_shell_command();
    info!("Running: {}", shell_cmd);
    let status = command
        .execute()
        .with_context(|| format!("Failed to execute: {}", shell_cmd))?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
