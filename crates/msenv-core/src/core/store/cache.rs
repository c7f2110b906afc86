use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::{cache_dir, home_dir};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::config::ProvisionConfig;
use crate::core::runtime::effects::Effects;
use crate::core::toolchain::installer::{extract_release, toolchain_tree};

const TOOL_DIR: &str = "msenv";
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone, Serialize)]
pub struct CacheLocation {
    pub path: PathBuf,
    pub source: &'static str,
}

/// Determine the root directory for the host-global toolchain cache.
///
/// # Errors
///
/// Returns an error if a relative override cannot be absolutized.
pub fn resolve_cache_root(override_path: Option<&str>) -> Result<CacheLocation> {
    if let Some(raw) = override_path {
        return Ok(CacheLocation {
            path: absolutize(PathBuf::from(raw))?,
            source: "MSENV_CACHE_PATH",
        });
    }
    if let Some(base) = cache_dir() {
        return Ok(CacheLocation {
            path: base.join(TOOL_DIR),
            source: "user cache dir",
        });
    }
    if let Some(home) = home_dir() {
        return Ok(CacheLocation {
            path: home.join(".cache").join(TOOL_DIR),
            source: "HOME/.cache",
        });
    }
    Ok(CacheLocation {
        path: env::temp_dir().join(TOOL_DIR),
        source: "temp dir",
    })
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()
            .context("failed to resolve MSENV_CACHE_PATH")?
            .join(path))
    }
}

/// Whether the pinned release has been extracted into the cache.
#[must_use]
pub fn is_release_cached(config: &ProvisionConfig) -> bool {
    config.release_dir().is_dir()
}

/// Returns the cached base toolchain tree, failing if the release was never cached.
///
/// # Errors
/// Returns [`crate::ProvisionError::CacheMissing`] when the release directory is absent.
pub fn cached_toolchain(config: &ProvisionConfig) -> Result<PathBuf> {
    if !is_release_cached(config) {
        return Err(crate::core::error::ProvisionError::CacheMissing {
            release: config.release.id.to_string(),
            cache_root: config.cache.path.clone(),
        }
        .into());
    }
    Ok(toolchain_tree(&config.release_dir()))
}

/// Makes sure the pinned release is downloaded and extracted exactly once.
///
/// The release directory only ever appears through an atomic rename, so its
/// presence means a complete extraction.
///
/// # Errors
/// Returns an error if the fetch tool or installer fails, or the cache cannot be written.
pub fn ensure_release_cached(config: &ProvisionConfig, effects: &dyn Effects) -> Result<PathBuf> {
    let release_dir = config.release_dir();
    if release_dir.is_dir() {
        debug!(release = config.release.id, path = %release_dir.display(), "release already cached");
        return Ok(toolchain_tree(&release_dir));
    }

    fs::create_dir_all(&config.cache.path)
        .with_context(|| format!("creating cache root {}", config.cache.path.display()))?;
    let archive = ensure_archive(config, effects)?;
    if let Err(err) = extract_release(effects, &archive, &release_dir) {
        // The archive itself may be bad; the next run fetches a fresh copy.
        if let Err(cleanup) = fs::remove_file(&archive) {
            warn!(archive = %archive.display(), error = %cleanup, "failed to discard archive");
        }
        return Err(err);
    }
    info!(release = config.release.id, path = %release_dir.display(), "cached base toolchain");
    Ok(toolchain_tree(&release_dir))
}

fn ensure_archive(config: &ProvisionConfig, effects: &dyn Effects) -> Result<PathBuf> {
    let archive = config.archive_path();
    if archive.is_file() {
        debug!(archive = %archive.display(), "reusing downloaded archive");
        return Ok(archive);
    }

    let partial = partial_path(&archive);
    if partial.exists() {
        fs::remove_file(&partial)
            .with_context(|| format!("removing stale download {}", partial.display()))?;
    }
    let url = config.release.url();
    info!(%url, "downloading base toolchain");
    let tool = config.fetch_tool.resolve()?;
    let fetched = effects.fetcher().fetch(&tool, &url, &partial);
    if let Err(err) = fetched {
        let _ = fs::remove_file(&partial);
        return Err(err).with_context(|| format!("fetching {url}"));
    }
    fs::rename(&partial, &archive)
        .with_context(|| format!("moving download into place at {}", archive.display()))?;
    Ok(archive)
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    archive.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProvisionError;
    use crate::core::testing::{Call, MockEffects};
    use crate::core::toolchain::installer::SHELL_MARKER;
    use tempfile::tempdir;

    fn config_in(root: &Path) -> ProvisionConfig {
        let mut config = ProvisionConfig::with_cache_root(root.join("cache"));
        config.fetch_tool = crate::core::config::FetchTool::Explicit(PathBuf::from("wget"));
        config
    }

    #[test]
    fn relative_override_is_absolutized() -> Result<()> {
        let location = resolve_cache_root(Some("relative-cache"))?;
        assert!(location.path.is_absolute());
        assert!(location.path.ends_with("relative-cache"));
        assert_eq!(location.source, "MSENV_CACHE_PATH");
        Ok(())
    }

    #[test]
    fn cold_cache_fetches_and_extracts_once() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let effects = MockEffects::new();

        let tree = ensure_release_cached(&config, &effects)?;
        assert_eq!(tree, config.release_dir().join("msys64"));
        assert!(tree.join(SHELL_MARKER).is_file());
        assert!(config.archive_path().is_file());
        assert!(!partial_path(&config.archive_path()).exists());

        let again = ensure_release_cached(&config, &effects)?;
        assert_eq!(again, tree);
        let calls = effects.calls();
        assert_eq!(
            calls
                .iter()
                .filter(|call| matches!(call, Call::Fetch { .. }))
                .count(),
            1
        );
        assert_eq!(
            calls
                .iter()
                .filter(|call| matches!(call, Call::Extract { .. }))
                .count(),
            1
        );
        Ok(())
    }

    #[test]
    fn fetch_targets_partial_file_and_pinned_url() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let effects = MockEffects::new();
        ensure_release_cached(&config, &effects)?;
        match &effects.calls()[0] {
            Call::Fetch { url, dest } => {
                assert_eq!(url, &config.release.url());
                assert_eq!(dest, &partial_path(&config.archive_path()));
            }
            other => panic!("expected fetch first, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn failed_fetch_leaves_no_archive_or_release() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let effects = MockEffects::new().failing_fetch();
        let err = ensure_release_cached(&config, &effects).expect_err("fetch fails");
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::ProcessFailed { .. })
        ));
        assert!(!config.archive_path().exists());
        assert!(!partial_path(&config.archive_path()).exists());
        assert!(!config.release_dir().exists());
        Ok(())
    }

    #[test]
    fn failed_extraction_does_not_poison_cache() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let failing = MockEffects::new().failing_extract();
        ensure_release_cached(&config, &failing).expect_err("extract fails");
        assert!(!config.release_dir().exists());
        assert!(!config.archive_path().exists(), "suspect archive is discarded");

        let effects = MockEffects::new();
        ensure_release_cached(&config, &effects)?;
        assert!(config.release_dir().is_dir());
        assert_eq!(
            effects
                .calls()
                .iter()
                .filter(|call| matches!(call, Call::Fetch { .. }))
                .count(),
            1,
            "retry should fetch a fresh archive"
        );
        Ok(())
    }

    #[test]
    fn incomplete_extraction_refetches_on_retry() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let hollow = MockEffects::new().hollow_extract();
        let err = ensure_release_cached(&config, &hollow).expect_err("no shell marker");
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::IncompleteToolchain { .. })
        ));
        assert!(!config.archive_path().exists());

        let effects = MockEffects::new();
        let tree = ensure_release_cached(&config, &effects)?;
        assert!(tree.join(SHELL_MARKER).is_file());
        assert!(matches!(effects.calls().first(), Some(Call::Fetch { .. })));
        Ok(())
    }

    #[test]
    fn killed_extraction_stage_is_cleared_on_next_run() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let leftover = config.cache.path.join(format!(".{}-killed", config.release.id));
        fs::create_dir_all(leftover.join("msys64/usr"))?;

        ensure_release_cached(&config, &MockEffects::new())?;
        assert!(!leftover.exists());
        assert!(config.release_dir().is_dir());
        Ok(())
    }

    #[test]
    fn downloaded_archive_is_reused_when_release_is_missing() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        fs::create_dir_all(&config.cache.path)?;
        fs::write(config.archive_path(), b"7z sfx archive")?;

        let effects = MockEffects::new();
        ensure_release_cached(&config, &effects)?;
        assert!(!effects
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Fetch { .. })));
        Ok(())
    }

    #[test]
    fn cached_toolchain_requires_release() -> Result<()> {
        let temp = tempdir()?;
        let config = config_in(temp.path());
        let err = cached_toolchain(&config).expect_err("nothing cached");
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::CacheMissing { .. })
        ));
        ensure_release_cached(&config, &MockEffects::new())?;
        assert_eq!(cached_toolchain(&config)?, config.release_dir().join("msys64"));
        Ok(())
    }
}
