//! Staging files in the destination directory.
//!
//! Every byte that ends up at `destination/name` is first written to a
//! `.binst-<name>.<random>.partial` file next to it, then renamed into
//! place. Staging files are deleted when dropped, so error returns and
//! cancelled futures leave nothing behind. Only a killed process can orphan
//! one; [`sweep`] cleans those up.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;

use crate::error::InstallError;

const PREFIX: &str = ".binst-";
const SUFFIX: &str = ".partial";

/// Create a staging file for `name` inside `dir`.
pub fn create(dir: &Path, name: &str) -> Result<NamedTempFile, InstallError> {
    tempfile::Builder::new()
        .prefix(&format!("{PREFIX}{name}."))
        .suffix(SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| InstallError::io("Failed to create staging file in", dir, e))
}

/// Mark `staged` executable, flush it to disk and rename it over `target`.
///
/// On failure the staging file is removed and `target` is untouched.
pub fn commit(staged: NamedTempFile, target: &Path) -> Result<(), InstallError> {
    set_executable(staged.as_file())
        .map_err(|e| InstallError::io("Failed to set permissions on", staged.path(), e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| InstallError::io("Failed to sync", staged.path(), e))?;

    // The PersistError owns the temp file; dropping it deletes the file.
    staged
        .persist(target)
        .map_err(|e| InstallError::io("Failed to move artifact into place at", target, e.error))?;

    Ok(())
}

#[cfg(unix)]
fn set_executable(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Whether `file_name` looks like one of our staging files.
pub fn is_staging_name(file_name: &str) -> bool {
    file_name.starts_with(PREFIX) && file_name.ends_with(SUFFIX)
}

/// Staging files in `dir` last modified more than `min_age` ago.
///
/// Younger files may belong to an install still in progress and are skipped.
pub fn stale(dir: &Path, min_age: Duration) -> Result<Vec<PathBuf>, InstallError> {
    let entries =
        fs::read_dir(dir).map_err(|e| InstallError::io("Failed to read directory", dir, e))?;
    let now = SystemTime::now();
    let mut found = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| InstallError::io("Failed to read directory", dir, e))?;
        let path = entry.path();

        let is_staging = entry.file_name().to_str().is_some_and(is_staging_name);
        if !is_staging {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < min_age {
            tracing::debug!("Keeping recent staging file {}", path.display());
            continue;
        }
        found.push(path);
    }

    Ok(found)
}

/// Remove the [`stale`] staging files in `dir` and return their paths.
pub fn sweep(dir: &Path, min_age: Duration) -> Result<Vec<PathBuf>, InstallError> {
    let mut removed = Vec::new();
    for path in stale(dir, min_age)? {
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed stale staging file {}", path.display());
                removed.push(path);
            }
            // Another sweeper or the owning install got there first.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(InstallError::io("Failed to remove", path, e)),
        }
    }
    Ok(removed)
}
