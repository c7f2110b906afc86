use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::installer::{shell_path, verify_tree};
use crate::core::runtime::effects::Effects;

/// Non-interactive, start-in-cwd, UCRT64 profile, then `-c <command>`.
const SHELL_FLAGS: [&str; 5] = ["-defterm", "-no-start", "-here", "-ucrt64", "-c"];

/// Initializes the toolchain's home and keyring on first launch.
pub const FIRST_LAUNCH_COMMAND: &str = "bash -c exit";
pub const BOOTSTRAP_PACKAGES: [&str; 2] = ["fish", "mingw-w64-ucrt-x86_64-python"];

#[must_use]
pub fn shell_args(command: &str) -> Vec<String> {
    SHELL_FLAGS
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once(command.to_string()))
        .collect()
}

#[must_use]
pub fn bootstrap_command() -> String {
    format!(
        "pacman -S --noconfirm --needed {}",
        BOOTSTRAP_PACKAGES.join(" ")
    )
}

/// Runs `command` through the embedded shell of the toolchain at `tree`.
///
/// # Errors
/// Returns an error if the tree has no shell or the command exits non-zero.
pub fn run_in_shell(effects: &dyn Effects, tree: &Path, command: &str, cwd: &Path) -> Result<()> {
    verify_tree(tree)?;
    let shell = shell_path(tree);
    info!(%command, cwd = %cwd.display(), "running in embedded shell");
    effects
        .shell()
        .run_in_shell(&shell, command, cwd)
        .with_context(|| format!("running `{command}` in {}", shell.display()))
}

/// One-time host setup against the shared cached toolchain.
///
/// # Errors
/// Returns an error if either bootstrap command fails.
pub fn bootstrap_host(effects: &dyn Effects, tree: &Path) -> Result<()> {
    run_in_shell(effects, tree, FIRST_LAUNCH_COMMAND, tree)?;
    run_in_shell(effects, tree, &bootstrap_command(), tree)
}
