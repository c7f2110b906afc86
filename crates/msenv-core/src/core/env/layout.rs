use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DATA_DIR: &str = "data";
pub const VENV_BIN_DIR: &str = "bin";
pub const ALIAS_DIR: &str = "Scripts";
pub const VENV_CONFIG: &str = "pyvenv.cfg";
pub const ACTIVATE_SCRIPT: &str = "Activate.ps1";

/// Paths inside one environment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    root: PathBuf,
}

impl EnvLayout {
    /// Anchors `name` under `base` and makes the result absolute.
    ///
    /// # Errors
    /// Returns an error if the current directory is needed but unavailable.
    pub fn resolve(base: &Path, name: &str) -> Result<Self> {
        let joined = base.join(name);
        let root = if joined.is_absolute() {
            joined
        } else {
            env::current_dir()
                .context("failed to resolve the current directory")?
                .join(joined)
        };
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The environment's private toolchain copy.
    #[must_use]
    pub fn data(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    #[must_use]
    pub fn venv_bin(&self) -> PathBuf {
        self.root.join(VENV_BIN_DIR)
    }

    #[must_use]
    pub fn venv_config(&self) -> PathBuf {
        self.root.join(VENV_CONFIG)
    }

    #[must_use]
    pub fn activate_script(&self) -> PathBuf {
        self.venv_bin().join(ACTIVATE_SCRIPT)
    }

    #[must_use]
    pub fn alias_dir(&self) -> PathBuf {
        self.root.join(ALIAS_DIR)
    }

    #[must_use]
    pub fn alias_script(&self) -> PathBuf {
        self.alias_dir().join(ACTIVATE_SCRIPT)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.data().is_dir() && self.venv_bin().is_dir()
    }
}
