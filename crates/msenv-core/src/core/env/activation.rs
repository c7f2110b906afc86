use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use super::layout::EnvLayout;
use crate::core::error::ProvisionError;
use crate::core::fs::{remove_dir_all_writable, write_if_changed};

/// Expression the generated `Activate.ps1` uses to find itself.
pub const SELF_REFERENCE: &str = "$MyInvocation.MyCommand.Definition";

/// A static launcher script shipped inside the binary.
#[derive(Debug, Clone, Copy)]
pub struct ActivationAsset {
    pub name: &'static str,
    pub contents: &'static str,
}

pub const ACTIVATION_ASSETS: [ActivationAsset; 2] = [
    ActivationAsset {
        name: "fish.ps1",
        contents: include_str!("../../../assets/fish.ps1"),
    },
    ActivationAsset {
        name: "bash.ps1",
        contents: include_str!("../../../assets/bash.ps1"),
    },
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationReport {
    pub assets_written: Vec<&'static str>,
    pub alias_created: bool,
    pub alias_patched: bool,
}

impl ActivationReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.assets_written.is_empty() || self.alias_created || self.alias_patched
    }
}

/// Literal, quoted, forward-slash form of `path` for embedding in a script.
#[must_use]
pub fn quoted_script_path(path: &Path) -> String {
    format!("\"{}\"", path.to_string_lossy().replace('\\', "/"))
}

/// Replaces every self-reference in `text` with the quoted `original` path.
///
/// Text without the expression comes back unchanged, so re-patching is a no-op.
#[must_use]
pub fn patch_self_reference(text: &str, original: &Path) -> String {
    text.replace(SELF_REFERENCE, &quoted_script_path(original))
}

/// Copies the launcher assets and the aliased activation script into `layout`.
///
/// Without `force` existing files are left alone. With `force` every asset and
/// the whole alias directory are recreated. The alias script is always patched.
///
/// # Errors
/// Returns [`ProvisionError::EnvironmentMissing`] if the venv has not been
/// created, or an I/O error from copying or patching.
pub fn install_activation(layout: &EnvLayout, force: bool) -> Result<ActivationReport> {
    let bin = layout.venv_bin();
    if !bin.is_dir() {
        return Err(ProvisionError::EnvironmentMissing {
            path: layout.root().to_path_buf(),
        }
        .into());
    }

    let mut report = ActivationReport::default();
    for asset in &ACTIVATION_ASSETS {
        let target = bin.join(asset.name);
        if force && target.exists() {
            fs::remove_file(&target)
                .with_context(|| format!("removing {}", target.display()))?;
        }
        if target.exists() {
            debug!(asset = asset.name, "activation asset already present");
            continue;
        }
        fs::write(&target, asset.contents)
            .with_context(|| format!("writing {}", target.display()))?;
        report.assets_written.push(asset.name);
    }

    let alias_dir = layout.alias_dir();
    if force {
        remove_dir_all_writable(&alias_dir)?;
    }
    if !layout.alias_script().is_file() {
        fs::create_dir_all(&alias_dir)
            .with_context(|| format!("creating {}", alias_dir.display()))?;
        let original = layout.activate_script();
        fs::copy(&original, layout.alias_script()).with_context(|| {
            format!(
                "copying {} into {}",
                original.display(),
                alias_dir.display()
            )
        })?;
        report.alias_created = true;
    }

    report.alias_patched = patch_alias_script(layout)?;
    if report.changed() {
        info!(env = %layout.root().display(), force, ?report, "activation layer updated");
    }
    Ok(report)
}

fn patch_alias_script(layout: &EnvLayout) -> Result<bool> {
    let alias = layout.alias_script();
    let text = fs::read_to_string(&alias)
        .with_context(|| format!("reading {}", alias.display()))?;
    write_if_changed(&alias, &patch_self_reference(&text, &layout.activate_script()))
}
