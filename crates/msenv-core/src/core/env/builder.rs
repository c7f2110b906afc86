use std::fs;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use super::activation::{install_activation, ActivationReport};
use super::layout::EnvLayout;
use super::venv_cfg::force_system_site_packages;
use crate::core::config::ProvisionConfig;
use crate::core::error::ProvisionError;
use crate::core::fs::{copy_tree, StagedDir};
use crate::core::runtime::effects::Effects;
use crate::core::store::cache::cached_toolchain;
use crate::core::toolchain::installer::verify_tree;
use crate::core::toolchain::shell::run_in_shell;

/// Creates the venv in the shell's working directory (the environment root).
pub const VENV_COMMAND: &str = "python -m venv .";

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub copied_files: Option<u64>,
    pub created_venv: bool,
    pub config_fixed: bool,
    pub activation: ActivationReport,
}

impl BuildReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.copied_files.is_some()
            || self.created_venv
            || self.config_fixed
            || self.activation.changed()
    }
}

/// Brings `layout` to a fully built environment, resuming whatever step is missing.
///
/// Each step is guarded by its own signal (`data/` for the toolchain copy,
/// `bin/` for the venv), so a partially built environment picks up where it
/// stopped and a finished one is left untouched.
///
/// # Errors
/// Returns an error if the base toolchain is not cached, the copy fails, or the
/// embedded shell cannot create the venv.
pub fn ensure_environment(
    config: &ProvisionConfig,
    effects: &dyn Effects,
    layout: &EnvLayout,
) -> Result<BuildReport> {
    let mut report = BuildReport::default();

    let data = layout.data();
    if data.is_dir() {
        debug!(path = %data.display(), "toolchain copy present");
    } else {
        let source = cached_toolchain(config)?;
        fs::create_dir_all(layout.root())
            .with_context(|| format!("creating {}", layout.root().display()))?;
        let stage = StagedDir::beside(&data, ".data-")?;
        info!(from = %source.display(), to = %data.display(), "copying base toolchain");
        let copied = copy_tree(&source, stage.path())
            .with_context(|| format!("copying toolchain into {}", layout.root().display()))?;
        verify_tree(stage.path())?;
        stage.commit()?;
        report.copied_files = Some(copied);
    }

    let bin = layout.venv_bin();
    if bin.is_dir() {
        debug!(path = %bin.display(), "venv present");
    } else {
        run_in_shell(effects, &data, VENV_COMMAND, layout.root())?;
        if !bin.is_dir() {
            bail!(
                "`{VENV_COMMAND}` finished but {} was not created",
                bin.display()
            );
        }
        report.created_venv = true;
    }

    let cfg = layout.venv_config();
    if report.created_venv || cfg.is_file() {
        report.config_fixed = force_system_site_packages(&cfg)?;
    }

    report.activation = install_activation(layout, false)?;
    if report.changed() {
        info!(env = %layout.root().display(), "environment ready");
    } else {
        debug!(env = %layout.root().display(), "environment already complete");
    }
    Ok(report)
}

/// Recreates only the activation layer of an environment that is already built.
///
/// # Errors
/// Returns [`ProvisionError::EnvironmentMissing`] when the toolchain copy or venv
/// is absent.
pub fn reinstall_activation(layout: &EnvLayout) -> Result<ActivationReport> {
    if !layout.is_built() {
        return Err(ProvisionError::EnvironmentMissing {
            path: layout.root().to_path_buf(),
        }
        .into());
    }
    install_activation(layout, true)
}
