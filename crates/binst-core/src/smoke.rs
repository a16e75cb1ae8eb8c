//! Post-install smoke test.
//!
//! Runs the installed executable (by default with `--version`) and checks
//! that it exits 0 and prints something. The installer never calls this
//! itself; it is offered to callers that want an acceptance check.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

/// Why an installed executable failed its smoke test.
#[derive(Error, Debug)]
pub enum SmokeError {
    /// The process could not be started or waited on.
    #[error("Failed to run {path}: {source}")]
    Spawn {
        /// Executable path
        path: String,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// The process was killed after `timeout`.
    #[error("{path} did not exit within {}s", .timeout.as_secs())]
    TimedOut {
        /// Executable path
        path: String,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// Non-zero exit status.
    #[error("{path} exited with {status}: {stderr}")]
    Failed {
        /// Executable path
        path: String,
        /// Exit status as printed by the OS
        status: String,
        /// Captured stderr, trimmed
        stderr: String,
    },

    /// Exit 0 but no version line.
    #[error("{path} printed nothing on stdout")]
    EmptyOutput {
        /// Executable path
        path: String,
    },
}

/// How to invoke the executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeTest {
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// How long to wait before killing it
    pub timeout: Duration,
}

impl Default for SmokeTest {
    fn default() -> Self {
        Self {
            args: vec!["--version".to_string()],
            timeout: Duration::from_secs(10),
        }
    }
}

/// What a passing smoke test printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeOutcome {
    /// First non-empty stdout line, trimmed (usually the version string)
    pub version_line: String,
    /// Complete stdout
    pub stdout: String,
}

/// Run `path` with `test.args` and require exit status 0 and non-empty stdout.
pub fn run_smoke_test(path: &Path, test: &SmokeTest) -> Result<SmokeOutcome, SmokeError> {
    let shown = path.display().to_string();

    let mut child = Command::new(path)
        .args(&test.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SmokeError::Spawn {
            path: shown.clone(),
            source,
        })?;

    // Drain pipes on their own threads so a chatty child cannot block on a full pipe.
    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let status = match child.wait_timeout(test.timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SmokeError::TimedOut {
                path: shown,
                timeout: test.timeout,
            });
        }
        Err(source) => {
            return Err(SmokeError::Spawn {
                path: shown,
                source,
            });
        }
    };

    let stdout = collect(stdout_reader);
    let stderr = collect(stderr_reader);

    if !status.success() {
        return Err(SmokeError::Failed {
            path: shown,
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    let Some(version_line) = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
    else {
        return Err(SmokeError::EmptyOutput { path: shown });
    };

    tracing::info!("Smoke test passed for {}: {version_line}", path.display());
    Ok(SmokeOutcome {
        version_line,
        stdout,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(reader: Option<std::thread::JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
