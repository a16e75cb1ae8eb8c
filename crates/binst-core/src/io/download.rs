//! Streaming download with on-the-fly digest computation.
//!
//! The body is written to a caller-owned sink while being hashed, so the
//! artifact is read from the network exactly once and never held in memory.

use std::io::Write;
use std::time::Duration;

use binst_schema::{Digest, DigestAlgorithm, DigestHasher};
use futures::StreamExt;
use reqwest::Client;

use crate::Reporter;
use crate::error::{FetchError, InstallError};

/// Outcome of a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Digest of every byte received
    pub digest: Digest,
    /// Number of bytes received
    pub size_bytes: u64,
}

/// A single GET, streamed into `sink`.
#[derive(Debug)]
pub struct FetchRequest<'a> {
    /// HTTP client; its timeout bounds the whole request
    pub client: &'a Client,
    /// Source URL
    pub url: &'a str,
    /// Timeout configured on `client`, for error reporting
    pub timeout: Duration,
    /// Algorithm to hash the body with
    pub algorithm: DigestAlgorithm,
}

impl FetchRequest<'_> {
    /// Fetch the body into `sink`, hashing as it arrives.
    ///
    /// Network failures and non-success statuses become [`FetchError`];
    /// failures writing to `sink` are filesystem errors.
    pub async fn stream_into<W: Write, R: Reporter>(
        &self,
        sink: &mut W,
        reporter: &R,
    ) -> Result<Fetched, InstallError> {
        let url = self.url;
        let timeout = self.timeout;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            }
            .into());
        }

        let total_size = response.content_length();
        reporter.fetching(url, 0, total_size);

        let mut stream = response.bytes_stream();
        let mut hasher = DigestHasher::new(self.algorithm);
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, timeout, e))?;
            sink.write_all(&chunk)
                .map_err(|e| InstallError::io("Failed to write download for", url, e))?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            reporter.fetching(url, downloaded, total_size);
        }

        sink.flush()
            .map_err(|e| InstallError::io("Failed to flush download for", url, e))?;

        tracing::debug!("Fetched {downloaded} bytes from {url}");

        Ok(Fetched {
            digest: hasher.finalize(),
            size_bytes: downloaded,
        })
    }
}

/// Build the shared HTTP client with a bounded request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .use_rustls_tls()
        .user_agent(crate::USER_AGENT)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .timeout(timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;

    fn request<'a>(client: &'a Client, url: &'a str) -> FetchRequest<'a> {
        FetchRequest {
            client,
            url,
            timeout: Duration::from_secs(5),
            algorithm: DigestAlgorithm::Sha256,
        }
    }

    #[tokio::test]
    async fn streams_body_and_hashes_it() {
        let mut server = Server::new_async().await;
        let body = b"#!/bin/sh\necho bap 0.1.0\n".to_vec();
        let _m = server
            .mock("GET", "/bap")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/bap", server.url());
        let mut sink = Vec::new();
        let fetched = request(&client, &url)
            .stream_into(&mut sink, &NullReporter)
            .await
            .unwrap();

        assert_eq!(sink, body);
        assert_eq!(fetched.size_bytes, body.len() as u64);
        assert_eq!(
            fetched.digest,
            Digest::compute(DigestAlgorithm::Sha256, &body)
        );
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/missing", server.url());
        let mut sink = Vec::new();
        let err = request(&client, &url)
            .stream_into(&mut sink, &NullReporter)
            .await
            .unwrap_err();

        match err {
            InstallError::Fetch(FetchError::Status { status, .. }) => {
                assert_eq!(status.as_u16(), 404);
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_error() {
        let client = build_client(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is closed on test machines.
        let url = "http://127.0.0.1:9/bap";
        let mut sink = Vec::new();
        let err = request(&client, url)
            .stream_into(&mut sink, &NullReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Fetch(_)), "{err:?}");
    }
}
