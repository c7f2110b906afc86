use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;

use super::activation::{quoted_script_path, ACTIVATION_ASSETS, SELF_REFERENCE};
use super::layout::EnvLayout;
use super::venv_cfg::{read_visibility, VISIBLE};
use crate::core::toolchain::installer::shell_path;

#[derive(Debug, Clone, Serialize)]
pub struct AssetStatus {
    pub name: &'static str,
    pub present: bool,
}

/// Read-only view of every provisioning signal for one environment.
#[derive(Debug, Clone, Serialize)]
pub struct EnvStatus {
    pub root: String,
    pub toolchain_copied: bool,
    pub toolchain_complete: bool,
    pub venv_created: bool,
    pub system_site_packages: Option<String>,
    pub assets: Vec<AssetStatus>,
    pub alias_present: bool,
    pub alias_patched: bool,
}

impl EnvStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.toolchain_complete
            && self.venv_created
            && self.system_site_packages.as_deref() == Some(VISIBLE)
            && self.assets.iter().all(|asset| asset.present)
            && self.alias_patched
    }

    /// First missing step, in build order.
    #[must_use]
    pub fn next_step(&self) -> Option<&'static str> {
        if !self.toolchain_copied {
            Some("copy base toolchain")
        } else if !self.toolchain_complete {
            Some("delete the incomplete data/ directory and rerun msenv")
        } else if !self.venv_created {
            Some("create venv")
        } else if self.system_site_packages.as_deref() != Some(VISIBLE) {
            Some("enable system site packages")
        } else if !self.assets.iter().all(|asset| asset.present) || !self.alias_patched {
            Some("install activation layer")
        } else {
            None
        }
    }
}

/// Inspects `layout` without touching it.
///
/// # Errors
/// Returns an error if a present file cannot be read.
pub fn inspect(layout: &EnvLayout) -> Result<EnvStatus> {
    let data = layout.data();
    let bin = layout.venv_bin();
    let alias = layout.alias_script();
    let alias_patched = if alias.is_file() {
        let text =
            fs::read_to_string(&alias).with_context(|| format!("reading {}", alias.display()))?;
        !text.contains(SELF_REFERENCE) && text.contains(&quoted_script_path(&layout.activate_script()))
    } else {
        false
    };
    Ok(EnvStatus {
        root: layout.root().display().to_string(),
        toolchain_copied: data.is_dir(),
        toolchain_complete: shell_path(&data).is_file(),
        venv_created: bin.is_dir(),
        system_site_packages: read_visibility(&layout.venv_config())?,
        assets: ACTIVATION_ASSETS
            .iter()
            .map(|asset| AssetStatus {
                name: asset.name,
                present: bin.join(asset.name).is_file(),
            })
            .collect(),
        alias_present: alias.is_file(),
        alias_patched,
    })
}
