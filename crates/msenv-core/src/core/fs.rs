use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Best-effort recursive chmod for trees that ship read-only files.
#[cfg(unix)]
pub(crate) fn make_writable_recursive(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if meta.file_type().is_symlink() {
        return;
    }
    let mode = if meta.is_dir() { 0o755 } else { 0o644 };
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
    if meta.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                make_writable_recursive(&entry.path());
            }
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn make_writable_recursive(path: &Path) {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if meta.file_type().is_symlink() {
        return;
    }
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = fs::set_permissions(path, perms);
    }
    if meta.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                make_writable_recursive(&entry.path());
            }
        }
    }
}

pub(crate) fn remove_dir_all_writable(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", path.display())),
    };
    if meta.file_type().is_symlink() || meta.is_file() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        return Ok(());
    }
    make_writable_recursive(path);
    fs::remove_dir_all(path).with_context(|| format!("failed to remove {}", path.display()))?;
    Ok(())
}

/// A scratch directory that becomes `target` only through [`StagedDir::commit`].
///
/// Dropping an uncommitted stage removes it, so an interrupted step never leaves
/// a directory that looks finished.
pub(crate) struct StagedDir {
    inner: Option<tempfile::TempDir>,
    target: PathBuf,
}

impl StagedDir {
    /// Creates the stage next to `target` (same parent, hence same filesystem).
    ///
    /// Stages with the same prefix left behind by a killed run are removed first.
    pub(crate) fn beside(target: &Path, prefix: &str) -> Result<Self> {
        let parent = target
            .parent()
            .with_context(|| format!("{} has no parent directory", target.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        prune_abandoned_stages(parent, prefix);
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .with_context(|| format!("failed to create staging dir under {}", parent.display()))?;
        Ok(Self {
            inner: Some(dir),
            target: target.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        self.inner
            .as_ref()
            .map_or(self.target.as_path(), tempfile::TempDir::path)
    }

    /// Renames the stage onto its target.
    pub(crate) fn commit(mut self) -> Result<PathBuf> {
        let Some(dir) = self.inner.take() else {
            return Ok(self.target.clone());
        };
        let stage = dir.keep();
        if let Err(err) = fs::rename(&stage, &self.target) {
            if let Err(cleanup) = remove_dir_all_writable(&stage) {
                warn!(path = %stage.display(), error = %cleanup, "failed to clean staging dir");
            }
            return Err(err).with_context(|| {
                format!(
                    "moving {} into place at {}",
                    stage.display(),
                    self.target.display()
                )
            });
        }
        Ok(self.target.clone())
    }
}

impl Drop for StagedDir {
    fn drop(&mut self) {
        let Some(dir) = self.inner.take() else {
            return;
        };
        let path = dir.keep();
        if let Err(err) = remove_dir_all_writable(&path) {
            warn!(path = %path.display(), error = %err, "failed to clean staging dir");
        }
    }
}

// Runs are not locked against each other, so any stage still on disk is orphaned.
fn prune_abandoned_stages(parent: &Path, prefix: &str) {
    let Ok(entries) = fs::read_dir(parent) else {
        return;
    };
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        let path = entry.path();
        debug!(path = %path.display(), "removing abandoned staging dir");
        if let Err(err) = remove_dir_all_writable(&path) {
            warn!(path = %path.display(), error = %err, "failed to remove abandoned staging dir");
        }
    }
}

/// Recursively copies `src` into `dst`, recreating symlinks where the platform allows.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
    let mut copied = 0u64;
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("walked entry escaped the source tree")?;
        let target = dst.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "copying {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let link = fs::read_link(src).with_context(|| format!("reading link {}", src.display()))?;
    std::os::unix::fs::symlink(&link, dst)
        .with_context(|| format!("linking {} -> {}", dst.display(), link.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    // Symlink creation needs elevated rights on Windows; copy the target instead.
    let meta = fs::metadata(src).with_context(|| format!("resolving link {}", src.display()))?;
    if meta.is_dir() {
        copy_tree(src, dst).map(|_| ())
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("copying {} to {}", src.display(), dst.display()))
    }
}

/// Writes `contents` only when they differ from what is on disk.
///
/// Returns `true` when the file was written.
pub(crate) fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    match fs::read_to_string(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}
