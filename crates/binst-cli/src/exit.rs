//! Mapping errors to process exit codes
//!
//! | code | meaning |
//! |------|---------|
//! | 1 | anything not listed below |
//! | 2 | configuration error (manifest, digest, flags) |
//! | 3 | fetch error |
//! | 4 | integrity error |
//! | 5 | install error |
//! | 6 | smoke test failed |

use binst_core::manifest::ManifestError;
use binst_core::smoke::SmokeError;
use binst_core::{ErrorKind, InstallError};
use binst_schema::{DigestError, SpecError};

/// Exit code used when the post-install smoke test fails.
pub const SMOKE_FAILED: u8 = 6;

/// Exit code for errors we cannot classify.
pub const OTHER: u8 = 1;

/// How a failed command should end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub code: u8,
    pub label: &'static str,
}

/// Classify `err` by the first known error type in its chain.
pub fn classify(err: &anyhow::Error) -> Failure {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<InstallError>() {
            return from_kind(e.kind());
        }
        if cause.is::<ManifestError>() || cause.is::<SpecError>() || cause.is::<DigestError>() {
            return from_kind(ErrorKind::Config);
        }
        if cause.is::<SmokeError>() {
            return Failure {
                code: SMOKE_FAILED,
                label: "smoke test failed",
            };
        }
    }
    Failure {
        code: OTHER,
        label: "error",
    }
}

fn from_kind(kind: ErrorKind) -> Failure {
    Failure {
        code: kind.exit_code(),
        label: kind.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use binst_core::{FetchError, IntegrityError};
    use binst_schema::{Digest, DigestAlgorithm};
    use std::time::Duration;

    #[test]
    fn install_errors_use_their_kind() {
        let err: anyhow::Error = InstallError::from(FetchError::Timeout {
            url: "https://example.test/bap".into(),
            timeout: Duration::from_secs(30),
        })
        .into();
        assert_eq!(classify(&err).code, 3);

        let err: anyhow::Error = InstallError::from(IntegrityError {
            url: "https://example.test/bap".into(),
            expected: Digest::compute(DigestAlgorithm::Sha256, b"a"),
            actual: Digest::compute(DigestAlgorithm::Sha256, b"b"),
        })
        .into();
        let failure = classify(&err);
        assert_eq!(failure.code, 4);
        assert_eq!(failure.label, "integrity error");

        let err: anyhow::Error = InstallError::NotADirectory("/etc/passwd".into()).into();
        assert_eq!(classify(&err).code, 5);
    }

    #[test]
    fn context_does_not_hide_the_cause() {
        let err = Err::<(), _>(ManifestError::MissingField("url"))
            .context("Failed to load bap.toml")
            .unwrap_err();
        assert_eq!(classify(&err).code, 2);

        let unsupported = binst_schema::Platform::from_target("freebsd", "x86_64").unwrap_err();
        let err: anyhow::Error = ManifestError::from(unsupported).into();
        let failure = classify(&err);
        assert_eq!(failure.code, 2);
        assert_eq!(failure.label, "configuration error");
    }

    #[test]
    fn smoke_and_unknown_errors() {
        let err: anyhow::Error = SmokeError::EmptyOutput {
            path: "/opt/bin/bap".into(),
        }
        .into();
        assert_eq!(classify(&err).code, SMOKE_FAILED);

        let err = anyhow::anyhow!("something else");
        assert_eq!(classify(&err), Failure { code: OTHER, label: "error" });
    }
}
