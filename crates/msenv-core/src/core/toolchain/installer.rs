use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::core::error::ProvisionError;
use crate::core::fs::StagedDir;
use crate::core::runtime::effects::Effects;

/// Directory the self-extracting archive unpacks into.
pub const TOOLCHAIN_DIR: &str = "msys64";
/// Embedded shell launcher; its presence marks a usable toolchain tree.
pub const SHELL_MARKER: &str = "msys2_shell.cmd";

#[must_use]
pub fn toolchain_tree(release_dir: &Path) -> PathBuf {
    release_dir.join(TOOLCHAIN_DIR)
}

#[must_use]
pub fn shell_path(tree: &Path) -> PathBuf {
    tree.join(SHELL_MARKER)
}

/// Fails unless `tree` contains the embedded shell.
///
/// # Errors
/// Returns [`ProvisionError::IncompleteToolchain`] when the marker is missing.
pub fn verify_tree(tree: &Path) -> Result<()> {
    if shell_path(tree).is_file() {
        Ok(())
    } else {
        Err(ProvisionError::IncompleteToolchain {
            path: tree.to_path_buf(),
            marker: SHELL_MARKER,
        }
        .into())
    }
}

/// Runs the installer into a staging directory and renames it to `release_dir`
/// once the extracted tree checks out.
///
/// # Errors
/// Returns an error if the installer fails, leaves an incomplete tree, or the
/// rename cannot happen. The staging directory is removed in every failure case.
pub fn extract_release(effects: &dyn Effects, archive: &Path, release_dir: &Path) -> Result<PathBuf> {
    let prefix = format!(
        ".{}-",
        release_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let stage = StagedDir::beside(release_dir, &prefix)?;
    info!(archive = %archive.display(), stage = %stage.path().display(), "extracting base toolchain");
    effects
        .installer()
        .extract(archive, stage.path())
        .with_context(|| format!("extracting {}", archive.display()))?;
    verify_tree(&toolchain_tree(stage.path()))?;
    stage.commit()
}
