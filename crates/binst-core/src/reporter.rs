//! Reporter trait for dependency injection
//!
//! This trait allows the installer to report progress and status without
//! being coupled to a specific terminal UI.

use std::path::Path;

use binst_schema::{Digest, InstalledArtifact};

/// Progress sink for an install.
pub trait Reporter: Send + Sync {
    /// Bytes received so far for `url`; `total` is the advertised length.
    fn fetching(&self, url: &str, current: u64, total: Option<u64>);

    /// The fetch finished and its digest was computed.
    fn verifying(&self, actual: &Digest);

    /// The verified executable is about to be renamed into `target`.
    fn installing(&self, target: &Path);

    /// Marks the install as successfully completed.
    fn done(&self, artifact: &InstalledArtifact);

    /// Marks the install as failed with a specific reason.
    fn failed(&self, reason: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn fetching(&self, url: &str, current: u64, total: Option<u64>) {
        (**self).fetching(url, current, total);
    }
    fn verifying(&self, actual: &Digest) {
        (**self).verifying(actual);
    }
    fn installing(&self, target: &Path) {
        (**self).installing(target);
    }
    fn done(&self, artifact: &InstalledArtifact) {
        (**self).done(artifact);
    }
    fn failed(&self, reason: &str) {
        (**self).failed(reason);
    }
}

impl<T: Reporter + ?Sized> Reporter for &T {
    fn fetching(&self, url: &str, current: u64, total: Option<u64>) {
        (**self).fetching(url, current, total);
    }
    fn verifying(&self, actual: &Digest) {
        (**self).verifying(actual);
    }
    fn installing(&self, target: &Path) {
        (**self).installing(target);
    }
    fn done(&self, artifact: &InstalledArtifact) {
        (**self).done(artifact);
    }
    fn failed(&self, reason: &str) {
        (**self).failed(reason);
    }
}

/// A no-op reporter for silent operations (e.g., scripting, testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn fetching(&self, _: &str, _: u64, _: Option<u64>) {}
    fn verifying(&self, _: &Digest) {}
    fn installing(&self, _: &Path) {}
    fn done(&self, _: &InstalledArtifact) {}
    fn failed(&self, _: &str) {}
}
