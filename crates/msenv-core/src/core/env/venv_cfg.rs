use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::fs::write_if_changed;

pub const SYSTEM_SITE_KEY: &str = "include-system-site-packages";
pub const VISIBLE: &str = "true";

/// Returns the value recorded for `key`, if any.
#[must_use]
pub fn lookup<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (name, value) = line.split_once('=')?;
        (name.trim() == key).then(|| value.trim())
    })
}

/// Rewrites (or appends) the system-site-packages line so it reads `true`.
///
/// Other lines, their order, and the file's line endings are preserved.
#[must_use]
pub fn with_system_site_packages(text: &str) -> String {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let wanted = format!("{SYSTEM_SITE_KEY} = {VISIBLE}");
    let mut out = String::with_capacity(text.len() + wanted.len());
    let mut found = false;
    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];
        let is_key = body
            .split_once('=')
            .is_some_and(|(name, _)| name.trim() == SYSTEM_SITE_KEY);
        if is_key {
            found = true;
            out.push_str(&wanted);
        } else {
            out.push_str(body);
        }
        out.push_str(ending);
    }
    if !found {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        out.push_str(&wanted);
        out.push_str(newline);
    }
    out
}

/// Forces system-site-packages visibility in the venv config at `path`.
///
/// Returns `true` when the file had to change.
///
/// # Errors
/// Returns an error if the config cannot be read or written.
pub fn force_system_site_packages(path: &Path) -> Result<bool> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading venv config {}", path.display()))?;
    write_if_changed(path, &with_system_site_packages(&text))
}

/// Reads the current visibility value, if the config exists and records one.
///
/// # Errors
/// Returns an error if the config exists but cannot be read.
pub fn read_visibility(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(lookup(&text, SYSTEM_SITE_KEY).map(ToString::to_string)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading venv config {}", path.display())),
    }
}
