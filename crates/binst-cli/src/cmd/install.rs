//! Install command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use binst_core::manifest::{InstallManifest, ManifestError};
use binst_core::smoke::{SmokeTest, run_smoke_test};
use binst_core::{InstallOptions, Installer};
use binst_schema::InstallSpec;

use crate::InstallArgs;
use crate::ui::Output;

/// Install from a manifest or from `--url/--digest/--name`.
pub async fn install(args: &InstallArgs, dry_run: bool, output: &Output) -> Result<()> {
    let default_dest = crate::try_bin_path();
    let spec = resolve_spec(args, default_dest.clone())?;

    if dry_run {
        output.info(&format!(
            "Would install {} ({}) from {}",
            spec.target_path().display(),
            spec.effective_format(),
            spec.source_url
        ));
        output.info(&format!("Expecting {}", spec.expected_digest));
        return Ok(());
    }

    // The default home is ours to create; any other destination must exist.
    if default_dest.as_ref() == Some(&spec.destination) {
        std::fs::create_dir_all(&spec.destination)
            .with_context(|| format!("Failed to create {}", spec.destination.display()))?;
    }

    let options = InstallOptions {
        timeout: Duration::from_secs(args.timeout),
    };
    let installer = Installer::new(options)?.with_reporter(output);
    let artifact = installer.install(&spec).await?;

    if args.verify {
        let path = artifact.path.clone();
        let outcome =
            tokio::task::spawn_blocking(move || run_smoke_test(&path, &SmokeTest::default()))
                .await??;
        output.success(&format!("Verified: {}", outcome.version_line));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    }
    Ok(())
}

/// Build the install spec from the manifest or the flag triple.
fn resolve_spec(args: &InstallArgs, default_dest: Option<PathBuf>) -> Result<InstallSpec> {
    let mut spec = if let Some(path) = &args.manifest {
        let manifest = InstallManifest::load(path)?;
        manifest
            .resolve_for_host(args.dest.as_deref(), default_dest)
            .with_context(|| format!("Failed to resolve {}", path.display()))?
    } else {
        let (Some(url), Some(digest), Some(name)) = (&args.url, &args.digest, &args.name) else {
            anyhow::bail!("--url, --digest and --name are required without a manifest");
        };
        let dest = args
            .dest
            .clone()
            .or(default_dest)
            .ok_or(ManifestError::NoDestination)?;
        InstallSpec::new(url.as_str(), digest.clone(), dest, name.as_str())?
    };

    if let Some(version) = &args.pkg_version {
        spec = spec.with_version(version.as_str());
    }
    if let Some(format) = args.format {
        spec = spec.with_format(format);
    }
    Ok(spec)
}
