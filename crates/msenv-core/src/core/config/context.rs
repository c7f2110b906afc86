use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::config::ProvisionConfig;
use crate::core::runtime::effects::{Effects, SharedEffects};

pub struct CommandContext {
    config: ProvisionConfig,
    effects: SharedEffects,
    cwd: PathBuf,
}

impl CommandContext {
    /// Creates a command context from the process environment.
    ///
    /// # Errors
    /// Returns an error if the configuration or working directory cannot be resolved.
    pub fn new(effects: SharedEffects) -> Result<Self> {
        let config = ProvisionConfig::from_env()?;
        let cwd = env::current_dir().context("failed to resolve the current directory")?;
        Ok(Self::with_config(config, effects, cwd))
    }

    #[must_use]
    pub fn with_config(config: ProvisionConfig, effects: SharedEffects, cwd: PathBuf) -> Self {
        Self {
            config,
            effects,
            cwd,
        }
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Directory environment names are resolved against.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn env_name<'n>(&'n self, requested: Option<&'n str>) -> &'n str {
        requested.unwrap_or(self.config.default_env_name.as_str())
    }
}
