//! In-memory stand-ins for the external tools, shared by unit tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;

use crate::core::error::ProvisionError;
use crate::core::runtime::effects::{Effects, Fetcher, Installer, ShellRunner};
use crate::core::toolchain::installer::{SHELL_MARKER, TOOLCHAIN_DIR};

/// Trimmed-down `Activate.ps1` as written by `python -m venv`.
pub(crate) const GENERATED_ACTIVATE: &str = r#"param([Parameter(Mandatory = $false)][String] $VenvDir)
$VenvExecPath = Split-Path -Parent $MyInvocation.MyCommand.Definition
$VenvExecDir = Get-Item -Path $VenvExecPath
if ($VenvDir) { Write-Verbose "VenvDir given as parameter" } else { $VenvDir = $VenvExecDir.Parent.FullName }
$Env:VIRTUAL_ENV = $VenvDir
"#;

const GENERATED_CFG: &str =
    "home = C:/msys64/ucrt64/bin\ninclude-system-site-packages = false\nversion = 3.12.7\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Fetch {
        url: String,
        dest: PathBuf,
    },
    Extract {
        archive: PathBuf,
        dest: PathBuf,
    },
    Shell {
        shell: PathBuf,
        command: String,
        cwd: PathBuf,
        shell_present: bool,
    },
}

/// Writes the minimum tree the provisioning steps look for.
pub(crate) fn seed_toolchain(tree: &Path) -> Result<()> {
    fs::create_dir_all(tree.join("usr/bin"))?;
    fs::create_dir_all(tree.join("ucrt64/bin"))?;
    fs::write(tree.join(SHELL_MARKER), "@echo off\r\n")?;
    fs::write(tree.join("usr/bin/bash.exe"), b"MZ")?;
    fs::write(tree.join("ucrt64/bin/python.exe"), b"MZ")?;
    Ok(())
}

fn failed(program: &str) -> anyhow::Error {
    ProvisionError::ProcessFailed {
        program: program.to_string(),
        code: 1,
        stderr: format!("{program} failed"),
    }
    .into()
}

pub(crate) struct MockEffects {
    calls: Mutex<Vec<Call>>,
    fail_fetch: bool,
    fail_extract: bool,
    hollow_extract: bool,
    fail_shell: bool,
    venv_cfg: String,
}

impl MockEffects {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_fetch: false,
            fail_extract: false,
            hollow_extract: false,
            fail_shell: false,
            venv_cfg: GENERATED_CFG.to_string(),
        }
    }

    pub(crate) fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub(crate) fn failing_extract(mut self) -> Self {
        self.fail_extract = true;
        self
    }

    /// Installer exits zero but leaves no embedded shell behind.
    pub(crate) fn hollow_extract(mut self) -> Self {
        self.hollow_extract = true;
        self
    }

    pub(crate) fn failing_shell(mut self) -> Self {
        self.fail_shell = true;
        self
    }

    pub(crate) fn venv_config(mut self, text: &str) -> Self {
        self.venv_cfg = text.to_string();
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl Effects for MockEffects {
    fn fetcher(&self) -> &dyn Fetcher {
        self
    }

    fn installer(&self) -> &dyn Installer {
        self
    }

    fn shell(&self) -> &dyn ShellRunner {
        self
    }
}

impl Fetcher for MockEffects {
    fn fetch(&self, _tool: &Path, url: &str, dest: &Path) -> Result<()> {
        self.record(Call::Fetch {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        if self.fail_fetch {
            fs::write(dest, b"trunc")?;
            return Err(failed("wget"));
        }
        fs::write(dest, b"7z sfx archive")?;
        Ok(())
    }
}

impl Installer for MockEffects {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        self.record(Call::Extract {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
        });
        if self.fail_extract {
            fs::create_dir_all(dest.join(TOOLCHAIN_DIR).join("usr"))?;
            return Err(failed("installer"));
        }
        if self.hollow_extract {
            fs::create_dir_all(dest.join(TOOLCHAIN_DIR))?;
            return Ok(());
        }
        seed_toolchain(&dest.join(TOOLCHAIN_DIR))
    }
}

impl ShellRunner for MockEffects {
    fn run_in_shell(&self, shell: &Path, command: &str, cwd: &Path) -> Result<()> {
        self.record(Call::Shell {
            shell: shell.to_path_buf(),
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            shell_present: shell.is_file(),
        });
        if self.fail_shell {
            return Err(failed("msys2_shell.cmd"));
        }
        if command == crate::core::env::builder::VENV_COMMAND {
            fs::create_dir_all(cwd.join("bin"))?;
            fs::write(cwd.join("bin/Activate.ps1"), GENERATED_ACTIVATE)?;
            fs::write(cwd.join("bin/python.exe"), b"MZ")?;
            fs::write(cwd.join("pyvenv.cfg"), &self.venv_cfg)?;
        }
        Ok(())
    }
}
