use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::process::run_command_streaming;
use crate::core::toolchain::shell::shell_args;

/// Downloads a URL to a file by delegating to an external fetch tool.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, tool: &Path, url: &str, dest: &Path) -> Result<()>;
}

/// Runs the self-extracting base toolchain archive.
pub trait Installer: Send + Sync {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Executes one command string inside a toolchain's embedded shell.
pub trait ShellRunner: Send + Sync {
    fn run_in_shell(&self, shell: &Path, command: &str, cwd: &Path) -> Result<()>;
}

pub trait Effects: Send + Sync {
    fn fetcher(&self) -> &dyn Fetcher;
    fn installer(&self) -> &dyn Installer;
    fn shell(&self) -> &dyn ShellRunner;
}

pub struct SystemEffects {
    fetcher: Arc<SystemFetcher>,
    installer: Arc<SystemInstaller>,
    shell: Arc<SystemShell>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(SystemFetcher),
            installer: Arc::new(SystemInstaller),
            shell: Arc::new(SystemShell),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    fn shell(&self) -> &dyn ShellRunner {
        self.shell.as_ref()
    }
}

struct SystemFetcher;

impl Fetcher for SystemFetcher {
    fn fetch(&self, tool: &Path, url: &str, dest: &Path) -> Result<()> {
        let args = vec![
            url.to_string(),
            "-O".to_string(),
            dest.display().to_string(),
        ];
        let cwd = dest.parent().unwrap_or_else(|| Path::new("."));
        debug!(tool = %tool.display(), ?args, "spawning fetch tool");
        run_command_streaming(tool, &args, cwd)?.ensure_success(tool)?;
        Ok(())
    }
}

struct SystemInstaller;

impl Installer for SystemInstaller {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let args = vec!["-y".to_string(), format!("-O{}", dest.display())];
        let cwd = archive.parent().unwrap_or_else(|| Path::new("."));
        debug!(archive = %archive.display(), ?args, "spawning installer");
        run_command_streaming(archive, &args, cwd)?.ensure_success(archive)?;
        Ok(())
    }
}

struct SystemShell;

impl ShellRunner for SystemShell {
    fn run_in_shell(&self, shell: &Path, command: &str, cwd: &Path) -> Result<()> {
        let args = shell_args(command);
        debug!(shell = %shell.display(), ?args, cwd = %cwd.display(), "spawning embedded shell");
        run_command_streaming(shell, &args, cwd)?.ensure_success(shell)?;
        Ok(())
    }
}

pub type SharedEffects = Arc<dyn Effects>;
