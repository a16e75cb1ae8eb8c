//! Install manifests (`*.toml` spec files).
//!
//! A manifest is the declarative form of an install: name, version, URL and
//! checksum, plus optional per-platform artifacts. [`InstallManifest::resolve`]
//! turns it into an [`InstallSpec`] for one host.

use std::path::{Path, PathBuf};

use binst_schema::{
    Arch, ArtifactFormat, Digest, DigestError, InstallSpec, Os, Platform, SpecError,
    UnsupportedHost,
};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading or resolving a manifest. All of them are configuration
/// errors.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("Failed to read manifest {}: {source}", .path.display())]
    Read {
        /// Manifest path
        path: PathBuf,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML, wrong types or unknown keys.
    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field needed for the selected artifact is absent.
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    /// The selected digest does not parse.
    #[error("Invalid digest: {0}")]
    Digest(#[from] DigestError),

    /// The resolved URL or executable name is invalid.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// Platform tables exist but none fits the host, and there is no top-level `url`.
    #[error("No artifact for platform {0}")]
    NoMatchingPlatform(Platform),

    /// No `--dest`, no `destination` key and no home directory.
    #[error("No destination given and the home directory could not be determined")]
    NoDestination,

    /// The running host cannot be matched against platform tables.
    #[error(transparent)]
    UnsupportedHost(#[from] UnsupportedHost),
}

/// One platform-specific artifact.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlatformArtifact {
    /// Operating system this artifact runs on
    pub os: Os,
    /// CPU architecture this artifact runs on
    pub arch: Arch,
    /// Download URL
    pub url: String,
    /// Expected digest (`sha256:<hex>`, or bare SHA-256 hex)
    #[serde(alias = "sha256")]
    pub digest: String,
    /// Format override for this artifact
    pub format: Option<ArtifactFormat>,
}

/// Parsed install manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InstallManifest {
    /// Package name; also the executable name unless `executable` is set
    pub name: String,
    /// Informational version
    pub version: Option<String>,
    /// Short description
    pub description: Option<String>,
    /// Project homepage
    pub homepage: Option<String>,
    /// Installed file name, defaults to `name`
    pub executable: Option<String>,
    /// Download URL used when no platform entry matches
    pub url: Option<String>,
    /// Digest for `url`
    #[serde(alias = "sha256")]
    pub digest: Option<String>,
    /// Format override for `url`
    pub format: Option<ArtifactFormat>,
    /// Install directory
    pub destination: Option<PathBuf>,
    /// Per-platform artifacts
    #[serde(default, rename = "platform")]
    pub platforms: Vec<PlatformArtifact>,
}

impl InstallManifest {
    /// Parse a manifest from TOML text.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Pick the artifact for `platform`: exact match, then the OS's
    /// universal build, then the top-level `url`.
    fn select(
        &self,
        platform: Platform,
    ) -> Result<(&str, &str, Option<ArtifactFormat>), ManifestError> {
        let exact = self
            .platforms
            .iter()
            .find(|p| p.os == platform.os && p.arch == platform.arch);
        let universal = || {
            self.platforms
                .iter()
                .find(|p| p.os == platform.os && p.arch == Arch::Universal)
        };

        if let Some(p) = exact.or_else(universal) {
            return Ok((p.url.as_str(), p.digest.as_str(), p.format.or(self.format)));
        }

        match (&self.url, &self.digest) {
            (Some(url), Some(digest)) => Ok((url.as_str(), digest.as_str(), self.format)),
            _ if !self.platforms.is_empty() => Err(ManifestError::NoMatchingPlatform(platform)),
            (None, _) => Err(ManifestError::MissingField("url")),
            (Some(_), None) => Err(ManifestError::MissingField("digest")),
        }
    }

    /// Build the install spec for `platform`.
    ///
    /// Destination precedence: `destination_override`, the manifest's
    /// `destination`, then `default_destination`.
    pub fn resolve(
        &self,
        platform: Platform,
        destination_override: Option<&Path>,
        default_destination: Option<PathBuf>,
    ) -> Result<InstallSpec, ManifestError> {
        let (url, digest, format) = self.select(platform)?;
        let digest = Digest::parse(digest)?;

        let destination = destination_override
            .map(Path::to_path_buf)
            .or_else(|| self.destination.clone())
            .or(default_destination)
            .ok_or(ManifestError::NoDestination)?;

        let executable = self.executable.as_deref().unwrap_or(&self.name);

        let mut spec = InstallSpec::new(url, digest, destination, executable)?;
        spec.version.clone_from(&self.version);
        spec.format = format;

        tracing::debug!(
            "Resolved {} for {platform}: {} -> {}",
            self.name,
            spec.source_url,
            spec.target_path().display()
        );
        Ok(spec)
    }

    /// [`resolve`](Self::resolve) for the running host.
    ///
    /// Fails with [`ManifestError::UnsupportedHost`] on hosts that have no
    /// [`Platform`] equivalent instead of guessing one.
    pub fn resolve_for_host(
        &self,
        destination_override: Option<&Path>,
        default_destination: Option<PathBuf>,
    ) -> Result<InstallSpec, ManifestError> {
        self.resolve(
            Platform::current()?,
            destination_override,
            default_destination,
        )
    }
}
