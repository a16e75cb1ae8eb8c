//! Clean command (stale staging files)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use binst_core::io::staging;

use crate::ui::Output;

/// Staging files younger than this may belong to a running install.
const MIN_AGE: Duration = Duration::from_secs(60 * 60);

/// Remove staging files left in `dest` by interrupted installs
pub fn clean(dest: Option<PathBuf>, dry_run: bool, output: &Output) -> Result<()> {
    let Some(dir) = dest.or_else(crate::try_bin_path) else {
        anyhow::bail!("No directory given and the home directory could not be determined");
    };

    if !dir.is_dir() {
        output.info(&format!("{} does not exist, nothing to clean", dir.display()));
        return Ok(());
    }

    if dry_run {
        for path in staging::stale(&dir, MIN_AGE)? {
            output.info(&format!("Would remove {}", path.display()));
        }
        return Ok(());
    }

    let removed = staging::sweep(&dir, MIN_AGE)?;
    match removed.len() {
        0 => output.success("Nothing to clean."),
        1 => output.success("Removed 1 staging file."),
        n => output.success(&format!("Removed {n} staging files.")),
    }
    Ok(())
}
