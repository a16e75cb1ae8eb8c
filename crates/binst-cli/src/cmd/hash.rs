//! Hash command

use anyhow::{Context, Result};
use binst_schema::{Digest, DigestAlgorithm};
use std::path::PathBuf;

/// Print the tagged digest of each file, ready to paste into a manifest.
pub fn hash(files: &[PathBuf], algorithm: DigestAlgorithm) -> Result<()> {
    for file in files {
        let reader = std::fs::File::open(file)
            .with_context(|| format!("Failed to open {}", file.display()))?;
        let digest = Digest::compute_reader(algorithm, reader)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!("{digest}  {}", file.display());
    }
    Ok(())
}
