//! Install inputs and results

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hash::Digest;

/// Archive or binary format of a downloadable artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Gzip-compressed tar archive (`.tar.gz` / `.tgz`).
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
    /// Zstandard-compressed tar archive (`.tar.zst`).
    #[serde(rename = "tar.zst", alias = "tzst")]
    TarZst,
    /// Uncompressed tar archive (`.tar`).
    Tar,
    /// Zip archive (`.zip`).
    Zip,
    /// Standalone executable with no archive wrapper.
    #[serde(alias = "raw")]
    Binary,
}

const SUFFIXES: [(&str, ArtifactFormat); 6] = [
    (".tar.gz", ArtifactFormat::TarGz),
    (".tgz", ArtifactFormat::TarGz),
    (".tar.zst", ArtifactFormat::TarZst),
    (".tzst", ArtifactFormat::TarZst),
    (".tar", ArtifactFormat::Tar),
    (".zip", ArtifactFormat::Zip),
];

impl ArtifactFormat {
    /// Guess the format from the file extension at the end of a URL or path.
    pub fn detect(url: &str) -> Self {
        let name = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_lowercase();

        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map_or(Self::Binary, |&(_, format)| format)
    }

    /// Whether the executable must be pulled out of an archive.
    pub fn is_archive(self) -> bool {
        self != Self::Binary
    }

    /// Name as written in spec files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            "tar.zst" | "tzst" => Ok(Self::TarZst),
            "tar" => Ok(Self::Tar),
            "zip" => Ok(Self::Zip),
            "binary" | "raw" => Ok(Self::Binary),
            _ => Err(format!("Unknown artifact format: {s}")),
        }
    }
}

/// Errors that can occur when building an [`InstallSpec`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(&'static str),

    /// The source URL uses an unsupported scheme.
    #[error("Invalid URL '{0}': must start with http:// or https://")]
    InvalidUrl(String),

    /// The executable name would escape the destination directory.
    #[error("Invalid executable name '{0}': must be a plain file name")]
    InvalidExecutableName(String),
}

/// Everything needed to install one executable.
///
/// Constructed once per install from a spec file or CLI flags. The
/// destination directory is checked by the installer, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallSpec {
    /// Where to fetch the artifact from.
    pub source_url: String,
    /// Digest the fetched bytes must match.
    pub expected_digest: Digest,
    /// Directory the executable is installed into.
    pub destination: PathBuf,
    /// File name of the installed executable.
    pub executable_name: String,
    /// Informational version string; never used for verification.
    pub version: Option<String>,
    /// Explicit artifact format; `None` means detect from the URL.
    pub format: Option<ArtifactFormat>,
}

impl InstallSpec {
    /// Validate and build a spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::EmptyField`] for an empty URL or executable name,
    /// [`SpecError::InvalidUrl`] if the URL is not http(s), or
    /// [`SpecError::InvalidExecutableName`] if the name contains a path
    /// separator or is `.`/`..`.
    pub fn new(
        source_url: impl Into<String>,
        expected_digest: Digest,
        destination: impl Into<PathBuf>,
        executable_name: impl Into<String>,
    ) -> Result<Self, SpecError> {
        let source_url = source_url.into();
        let executable_name = executable_name.into();

        if source_url.is_empty() {
            return Err(SpecError::EmptyField("url"));
        }
        if !(source_url.starts_with("http://") || source_url.starts_with("https://")) {
            return Err(SpecError::InvalidUrl(source_url));
        }
        if executable_name.is_empty() {
            return Err(SpecError::EmptyField("executable name"));
        }
        if executable_name == "."
            || executable_name == ".."
            || executable_name.contains(['/', '\\'])
        {
            return Err(SpecError::InvalidExecutableName(executable_name));
        }

        Ok(Self {
            source_url,
            expected_digest,
            destination: destination.into(),
            executable_name,
            version: None,
            format: None,
        })
    }

    /// Attach an informational version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Override format detection.
    pub fn with_format(mut self, format: ArtifactFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Final location of the installed executable.
    pub fn target_path(&self) -> PathBuf {
        self.destination.join(&self.executable_name)
    }

    /// Declared format, or the one detected from the URL.
    pub fn effective_format(&self) -> ArtifactFormat {
        self.format
            .unwrap_or_else(|| ArtifactFormat::detect(&self.source_url))
    }
}

/// Result of a successful install.
///
/// `path` exists, is executable, and holds exactly the verified bytes (or
/// the executable extracted from them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledArtifact {
    /// `destination/executable_name`
    pub path: PathBuf,
    /// Verified digest of the fetched artifact.
    pub digest: Digest,
    /// Number of bytes fetched.
    pub size_bytes: u64,
}
