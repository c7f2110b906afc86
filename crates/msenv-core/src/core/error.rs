use std::path::PathBuf;

use crate::core::tooling::outcome::CommandStatus;

/// Domain failures raised by the provisioning steps.
///
/// Everything else (I/O, spawn failures) travels as plain `anyhow` context chains.
#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    #[error("{program} exited with status {code}")]
    ProcessFailed {
        program: String,
        code: i32,
        stderr: String,
    },
    #[error("base toolchain {release} is not cached under {}", cache_root.display())]
    CacheMissing { release: String, cache_root: PathBuf },
    #[error("toolchain tree at {} is incomplete (missing {marker})", path.display())]
    IncompleteToolchain { path: PathBuf, marker: &'static str },
    #[error("environment at {} has not been built", path.display())]
    EnvironmentMissing { path: PathBuf },
    #[error("fetch tool `{tool}` was not found on PATH")]
    FetchToolNotFound { tool: String },
}

impl ProvisionError {
    #[must_use]
    pub fn status(&self) -> CommandStatus {
        match self {
            Self::CacheMissing { .. }
            | Self::EnvironmentMissing { .. }
            | Self::FetchToolNotFound { .. } => CommandStatus::UserError,
            Self::ProcessFailed { .. } | Self::IncompleteToolchain { .. } => {
                CommandStatus::Failure
            }
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::CacheMissing { .. } => {
                Some("run `msenv --init` once to download and bootstrap the base toolchain".into())
            }
            Self::EnvironmentMissing { .. } => {
                Some("run `msenv` without --force to build the environment first".into())
            }
            Self::FetchToolNotFound { .. } => {
                Some("install wget or point MSENV_FETCH_TOOL at a compatible downloader".into())
            }
            Self::ProcessFailed { stderr, .. } if !stderr.is_empty() => Some(stderr.clone()),
            Self::IncompleteToolchain { path, .. } if path.exists() => {
                Some(format!("delete {} and rerun msenv", path.display()))
            }
            Self::ProcessFailed { .. } | Self::IncompleteToolchain { .. } => None,
        }
    }
}
