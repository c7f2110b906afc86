use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::core::store::cache::{resolve_cache_root, CacheLocation};

pub const DEFAULT_ENV_NAME: &str = ".venv";
pub const DEFAULT_FETCH_TOOL: &str = "wget";

pub(crate) const CACHE_PATH_ENV: &str = "MSENV_CACHE_PATH";
pub(crate) const FETCH_TOOL_ENV: &str = "MSENV_FETCH_TOOL";
pub(crate) const DEFAULT_ENV_ENV: &str = "MSENV_DEFAULT_ENV";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Pinned base toolchain build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub id: &'static str,
    pub archive: &'static str,
}

impl Release {
    pub const PINNED: Self = Self {
        id: "2024-12-08",
        archive: "msys2-base-x86_64-20241208.sfx.exe",
    };

    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "https://github.com/msys2/msys2-installer/releases/download/{}/{}",
            self.id, self.archive
        )
    }
}

/// How the fetch tool should be located when a download is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTool {
    Explicit(PathBuf),
    OnPath(String),
}

impl FetchTool {
    /// Resolves the tool to an executable path.
    ///
    /// # Errors
    /// Returns [`crate::ProvisionError::FetchToolNotFound`] if the tool is not on `PATH`.
    pub fn resolve(&self) -> anyhow::Result<PathBuf> {
        match self {
            Self::Explicit(path) => Ok(path.clone()),
            Self::OnPath(name) => which::which(name).map_err(|_| {
                crate::core::error::ProvisionError::FetchToolNotFound { tool: name.clone() }
                    .into()
            }),
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Explicit(path) => path.display().to_string(),
            Self::OnPath(name) => name.clone(),
        }
    }
}

/// Everything the provisioning state machine needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub cache: CacheLocation,
    pub release: Release,
    pub fetch_tool: FetchTool,
    pub default_env_name: String,
}

impl ProvisionConfig {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if the cache root cannot be resolved.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> anyhow::Result<Self> {
        Ok(Self {
            cache: resolve_cache_root(snapshot.var(CACHE_PATH_ENV))?,
            release: Release::PINNED,
            fetch_tool: match snapshot.var(FETCH_TOOL_ENV) {
                Some(path) => FetchTool::Explicit(PathBuf::from(path)),
                None => FetchTool::OnPath(DEFAULT_FETCH_TOOL.to_string()),
            },
            default_env_name: snapshot
                .var(DEFAULT_ENV_ENV)
                .unwrap_or(DEFAULT_ENV_NAME)
                .to_string(),
        })
    }

    /// Explicit configuration rooted at `cache_root`, bypassing the environment.
    #[must_use]
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache: CacheLocation {
                path: cache_root,
                source: "explicit",
            },
            release: Release::PINNED,
            fetch_tool: FetchTool::OnPath(DEFAULT_FETCH_TOOL.to_string()),
            default_env_name: DEFAULT_ENV_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn release_dir(&self) -> PathBuf {
        self.cache.path.join(self.release.id)
    }

    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.cache.path.join(self.release.archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_overrides() {
        let snapshot = EnvSnapshot::testing(&[]);
        let config = ProvisionConfig::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.release, Release::PINNED);
        assert_eq!(config.default_env_name, DEFAULT_ENV_NAME);
        assert_eq!(
            config.fetch_tool,
            FetchTool::OnPath(DEFAULT_FETCH_TOOL.to_string())
        );
        assert!(config.cache.path.ends_with("msenv"));
    }

    #[test]
    fn env_overrides_apply() {
        let snapshot = EnvSnapshot::testing(&[
            (CACHE_PATH_ENV, "/tmp/msenv-cache"),
            (FETCH_TOOL_ENV, "/opt/bin/curl-wget"),
            (DEFAULT_ENV_ENV, ".env"),
        ]);
        let config = ProvisionConfig::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.cache.path, PathBuf::from("/tmp/msenv-cache"));
        assert_eq!(config.cache.source, CACHE_PATH_ENV);
        assert_eq!(
            config.fetch_tool,
            FetchTool::Explicit(PathBuf::from("/opt/bin/curl-wget"))
        );
        assert_eq!(config.default_env_name, ".env");
        assert_eq!(
            config.release_dir(),
            PathBuf::from("/tmp/msenv-cache").join("2024-12-08")
        );
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let snapshot = EnvSnapshot::testing(&[(DEFAULT_ENV_ENV, "  ")]);
        let config = ProvisionConfig::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.default_env_name, DEFAULT_ENV_NAME);
    }

    #[test]
    fn release_url_is_pinned() {
        assert_eq!(
            Release::PINNED.url(),
            "https://github.com/msys2/msys2-installer/releases/download/2024-12-08/msys2-base-x86_64-20241208.sfx.exe"
        );
    }
}
