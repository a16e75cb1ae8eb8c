//! Verified, atomic installation of a single executable.
//!
//! The main entry point is [`Installer::install`]:
//!
//! 1. check the destination is a directory
//! 2. stream the artifact into a staging file beside the target, hashing it
//! 3. compare against the expected digest; on mismatch nothing is installed
//! 4. for archives, extract the named executable into a second staging file
//! 5. `chmod 0755`, `fsync`, and rename over the target
//!
//! Staging files are removed on drop, so every early return, and a future
//! dropped mid-download, leaves the destination exactly as it was. Nothing
//! after the download awaits, so cancellation can only happen while
//! fetching.

use std::path::Path;
use std::time::Duration;

use binst_schema::{InstallSpec, InstalledArtifact};
use reqwest::Client;

use crate::Reporter;
use crate::error::{FetchError, InstallError, IntegrityError};
use crate::io::download::{self, FetchRequest};
use crate::io::{extract, staging};
use crate::reporter::NullReporter;

/// Default bound on a single fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables shared by every install an [`Installer`] performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Upper bound on connecting and downloading one artifact.
    pub timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Performs installs. Holds no per-install state; one instance may be
/// reused for any number of specs.
#[derive(Debug, Clone)]
pub struct Installer<R: Reporter = NullReporter> {
    client: Client,
    options: InstallOptions,
    reporter: R,
}

impl Installer<NullReporter> {
    /// Create an installer that reports nothing.
    pub fn new(options: InstallOptions) -> Result<Self, InstallError> {
        let client = download::build_client(options.timeout).map_err(FetchError::Client)?;
        Ok(Self {
            client,
            options,
            reporter: NullReporter,
        })
    }
}

impl<R: Reporter> Installer<R> {
    /// Swap in a progress reporter.
    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> Installer<R2> {
        Installer {
            client: self.client,
            options: self.options,
            reporter,
        }
    }

    /// Fetch, verify and atomically install `spec`.
    ///
    /// Re-running with the same spec re-downloads and re-verifies, then
    /// replaces the target with identical bytes.
    pub async fn install(&self, spec: &InstallSpec) -> Result<InstalledArtifact, InstallError> {
        let result = self.install_inner(spec).await;
        match &result {
            Ok(artifact) => self.reporter.done(artifact),
            Err(e) => self.reporter.failed(&e.to_string()),
        }
        result
    }

    async fn install_inner(&self, spec: &InstallSpec) -> Result<InstalledArtifact, InstallError> {
        let dest_dir = spec.destination.as_path();
        let target = spec.target_path();
        let format = spec.effective_format();

        ensure_directory(dest_dir)?;

        tracing::info!(
            "Installing {} from {} ({format}) into {}",
            spec.executable_name,
            spec.source_url,
            dest_dir.display()
        );

        let mut download = staging::create(dest_dir, &spec.executable_name)?;
        let request = FetchRequest {
            client: &self.client,
            url: &spec.source_url,
            timeout: self.options.timeout,
            algorithm: spec.expected_digest.algorithm(),
        };
        let fetched = request
            .stream_into(download.as_file_mut(), &self.reporter)
            .await?;

        self.reporter.verifying(&fetched.digest);
        if fetched.digest != spec.expected_digest {
            tracing::warn!(
                "Digest mismatch for {}: expected {}, got {}",
                spec.source_url,
                spec.expected_digest,
                fetched.digest
            );
            return Err(IntegrityError {
                url: spec.source_url.clone(),
                expected: spec.expected_digest.clone(),
                actual: fetched.digest,
            }
            .into());
        }
        tracing::debug!("Verified {} ({} bytes)", fetched.digest, fetched.size_bytes);

        let staged = if format.is_archive() {
            let mut executable = staging::create(dest_dir, &spec.executable_name)?;
            extract::extract_executable(
                download.as_file_mut(),
                format,
                &spec.executable_name,
                executable.as_file_mut(),
            )?;
            drop(download);
            executable
        } else {
            download
        };

        self.reporter.installing(&target);
        staging::commit(staged, &target)?;

        tracing::info!("Installed {}", target.display());

        Ok(InstalledArtifact {
            path: target,
            digest: fetched.digest,
            size_bytes: fetched.size_bytes,
        })
    }
}

/// Install `spec` with default options and no progress reporting.
pub async fn install(spec: &InstallSpec) -> Result<InstalledArtifact, InstallError> {
    Installer::new(InstallOptions::default())?.install(spec).await
}

fn ensure_directory(dir: &Path) -> Result<(), InstallError> {
    let metadata = std::fs::metadata(dir)
        .map_err(|e| InstallError::io("Cannot access destination", dir, e))?;
    if !metadata.is_dir() {
        return Err(InstallError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::io::extract::fixtures::{tar_gz_bytes, zip_bytes};
    use binst_schema::{ArtifactFormat, Digest, DigestAlgorithm};
    use mockito::{Server, ServerGuard};
    use std::fs;
    use std::sync::{Arc, Mutex};

    const BINARY: &[u8] = b"#!/bin/sh\necho 'bap 0.1.0'\n";

    fn sha256(data: &[u8]) -> Digest {
        Digest::compute(DigestAlgorithm::Sha256, data)
    }

    async fn serve(server: &mut ServerGuard, path: &str, body: &[u8]) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(body)
            .create_async()
            .await
    }

    fn spec(server: &ServerGuard, path: &str, digest: Digest, dest: &Path) -> InstallSpec {
        InstallSpec::new(format!("{}{path}", server.url()), digest, dest, "bap").unwrap()
    }

    fn installer() -> Installer {
        Installer::new(InstallOptions {
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    /// Every entry in `dir`, so tests can assert nothing was left behind.
    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn installs_raw_binary() {
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap", BINARY).await;
        let dest = tempfile::tempdir().unwrap();

        let artifact = installer()
            .install(&spec(&server, "/bap", sha256(BINARY), dest.path()))
            .await
            .unwrap();

        assert_eq!(artifact.path, dest.path().join("bap"));
        assert_eq!(artifact.digest, sha256(BINARY));
        assert_eq!(artifact.size_bytes, BINARY.len() as u64);
        assert_eq!(fs::read(&artifact.path).unwrap(), BINARY);
        assert_eq!(dir_entries(dest.path()), vec!["bap"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&artifact.path).unwrap().permissions().mode();
            assert_ne!(mode & 0o111, 0, "installed file must be executable");
        }
    }

    #[tokio::test]
    async fn installs_executable_from_tar_gz() {
        let archive = tar_gz_bytes(&[("LICENSE", b"MIT"), ("bap", BINARY)]);
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap-0.1.0.tar.gz", &archive).await;
        let dest = tempfile::tempdir().unwrap();

        let artifact = installer()
            .install(&spec(
                &server,
                "/bap-0.1.0.tar.gz",
                sha256(&archive),
                dest.path(),
            ))
            .await
            .unwrap();

        assert_eq!(artifact.digest, sha256(&archive));
        assert_eq!(artifact.size_bytes, archive.len() as u64);
        assert_eq!(fs::read(&artifact.path).unwrap(), BINARY);
        assert_eq!(dir_entries(dest.path()), vec!["bap"]);
    }

    #[tokio::test]
    async fn explicit_format_overrides_detection() {
        let archive = zip_bytes(&[("bap", BINARY)]);
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/download", &archive).await;
        let dest = tempfile::tempdir().unwrap();

        let spec = spec(&server, "/download", sha256(&archive), dest.path())
            .with_format(ArtifactFormat::Zip);
        let artifact = installer().install(&spec).await.unwrap();
        assert_eq!(fs::read(&artifact.path).unwrap(), BINARY);
    }

    #[tokio::test]
    async fn reinstall_is_idempotent() {
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap", BINARY).await;
        let dest = tempfile::tempdir().unwrap();
        let spec = spec(&server, "/bap", sha256(BINARY), dest.path());
        let installer = installer();

        let first = installer.install(&spec).await.unwrap();
        let second = installer.install(&spec).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&second.path).unwrap(), BINARY);
        assert_eq!(dir_entries(dest.path()), vec!["bap"]);
    }

    #[tokio::test]
    async fn digest_mismatch_installs_nothing() {
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap", BINARY).await;
        let dest = tempfile::tempdir().unwrap();

        let wrong = sha256(b"something else");
        let err = installer()
            .install(&spec(&server, "/bap", wrong.clone(), dest.path()))
            .await
            .unwrap_err();

        match &err {
            InstallError::Integrity(e) => {
                assert_eq!(e.expected, wrong);
                assert_eq!(e.actual, sha256(BINARY));
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn digest_mismatch_keeps_previous_install() {
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap", b"tampered").await;
        let dest = tempfile::tempdir().unwrap();
        fs::write(dest.path().join("bap"), BINARY).unwrap();

        let err = installer()
            .install(&spec(&server, "/bap", sha256(BINARY), dest.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Integrity(_)));
        assert_eq!(fs::read(dest.path().join("bap")).unwrap(), BINARY);
        assert_eq!(dir_entries(dest.path()), vec!["bap"]);
    }

    #[tokio::test]
    async fn sha512_digests_are_verified() {
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap", BINARY).await;
        let dest = tempfile::tempdir().unwrap();

        let digest = Digest::compute(DigestAlgorithm::Sha512, BINARY);
        let artifact = installer()
            .install(&spec(&server, "/bap", digest.clone(), dest.path()))
            .await
            .unwrap();
        assert_eq!(artifact.digest, digest);
    }

    #[tokio::test]
    async fn http_error_is_a_fetch_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/bap")
            .with_status(503)
            .create_async()
            .await;
        let dest = tempfile::tempdir().unwrap();

        let err = installer()
            .install(&spec(&server, "/bap", sha256(BINARY), dest.path()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn missing_archive_member_installs_nothing() {
        let archive = tar_gz_bytes(&[("README.md", b"no binary here")]);
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap.tar.gz", &archive).await;
        let dest = tempfile::tempdir().unwrap();

        let err = installer()
            .install(&spec(&server, "/bap.tar.gz", sha256(&archive), dest.path()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Install);
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn destination_must_be_a_directory() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();

        let err = installer()
            .install(&spec(&server, "/bap", sha256(BINARY), &file))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::NotADirectory(_)));

        let err = installer()
            .install(&spec(&server, "/bap", sha256(BINARY), &dir.path().join("missing")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Install);
    }

    /// Accept one request, send headers and `sent` of the advertised body
    /// bytes, then go silent.
    async fn stalling_server(sent: usize) -> (String, tokio::task::JoinHandle<()>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\n\
                        content-type: application/octet-stream\r\n\
                        content-length: 1048576\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&vec![0u8; sent]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        (format!("http://{addr}/bap"), handle)
    }

    fn staging_entries(dir: &Path) -> Vec<String> {
        dir_entries(dir)
            .into_iter()
            .filter(|name| staging::is_staging_name(name))
            .collect()
    }

    #[tokio::test]
    async fn stalled_body_times_out_and_installs_nothing() {
        let (url, server) = stalling_server(1024).await;
        let dest = tempfile::tempdir().unwrap();
        let spec = InstallSpec::new(url, sha256(BINARY), dest.path(), "bap").unwrap();
        let installer = Installer::new(InstallOptions {
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let started = std::time::Instant::now();
        let err = installer.install(&spec).await.unwrap_err();
        server.abort();

        match err {
            InstallError::Fetch(FetchError::Timeout { timeout, .. }) => {
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn cancelled_install_leaves_no_staging_file() {
        let (url, server) = stalling_server(1024).await;
        let dest = tempfile::tempdir().unwrap();
        let spec = InstallSpec::new(url, sha256(BINARY), dest.path(), "bap").unwrap();
        let installer = installer();

        let mut pending = Box::pin(installer.install(&spec));
        let polled = tokio::time::timeout(Duration::from_millis(300), &mut pending).await;
        assert!(polled.is_err(), "install should still be waiting on the body");

        let during = staging_entries(dest.path());
        assert_eq!(during.len(), 1, "{during:?}");
        assert!(during[0].starts_with(".binst-bap."));

        drop(pending);
        server.abort();

        assert!(dir_entries(dest.path()).is_empty());
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Reporter for Recorder {
        fn fetching(&self, _: &str, _: u64, _: Option<u64>) {}
        fn verifying(&self, _: &Digest) {
            self.0.lock().unwrap().push("verifying".into());
        }
        fn installing(&self, _: &Path) {
            self.0.lock().unwrap().push("installing".into());
        }
        fn done(&self, _: &InstalledArtifact) {
            self.0.lock().unwrap().push("done".into());
        }
        fn failed(&self, _: &str) {
            self.0.lock().unwrap().push("failed".into());
        }
    }

    #[tokio::test]
    async fn reporter_sees_each_phase() {
        let mut server = Server::new_async().await;
        let _m = serve(&mut server, "/bap", BINARY).await;
        let dest = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());

        installer()
            .with_reporter(recorder.clone())
            .install(&spec(&server, "/bap", sha256(BINARY), dest.path()))
            .await
            .unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["verifying", "installing", "done"]
        );
    }
}
