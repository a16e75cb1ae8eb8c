//! Domain-specific errors for install operations

use std::path::PathBuf;
use std::time::Duration;

use binst_schema::Digest;
use thiserror::Error;

use crate::io::extract::ExtractError;

/// Network or transport failure while fetching an artifact.
///
/// Recoverable by retrying the whole install.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not finish within the configured timeout.
    #[error("Fetching {url} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout that was exceeded
        timeout: Duration,
    },

    /// The server answered with a non-success status.
    #[error("Fetching {url} failed: HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status
        status: reqwest::StatusCode,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS, redirect or body-read failure.
    #[error("Fetching {url} failed: {source}")]
    Http {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status,
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// The fetched bytes do not match the expected digest.
///
/// Retrying the same URL/digest pair cannot fix this: either the upstream
/// artifact changed or the configured digest is wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Integrity check failed for {url}: expected {expected}, got {actual}")]
pub struct IntegrityError {
    /// Requested URL
    pub url: String,
    /// Digest from the install spec
    pub expected: Digest,
    /// Digest of the bytes actually received
    pub actual: Digest,
}

/// Top-level error returned by [`crate::Installer::install`].
#[derive(Error, Debug)]
pub enum InstallError {
    /// See [`FetchError`].
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// See [`IntegrityError`].
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Filesystem failure (permissions, disk full, cross-device rename).
    #[error("{context} {}: {source}", .path.display())]
    Io {
        /// What was being attempted
        context: &'static str,
        /// Path the operation touched
        path: PathBuf,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// The destination exists but is not a directory.
    #[error("Destination {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The verified archive could not be unpacked.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl InstallError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Coarse classification used for exit codes and messages.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Io { .. } | Self::NotADirectory(_) | Self::Extract(_) => ErrorKind::Install,
        }
    }
}

/// Error kinds a caller can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration: manifest, digest or flags. Raised before an
    /// install starts, so never returned by [`InstallError::kind`].
    Config,
    /// Network failure; retrying may help.
    Fetch,
    /// Digest mismatch; retrying will not help.
    Integrity,
    /// Filesystem failure at the destination.
    Install,
}

impl ErrorKind {
    /// Process exit code for this kind.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Config => 2,
            Self::Fetch => 3,
            Self::Integrity => 4,
            Self::Install => 5,
        }
    }

    /// Short label for messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "configuration error",
            Self::Fetch => "fetch error",
            Self::Integrity => "integrity error",
            Self::Install => "install error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
