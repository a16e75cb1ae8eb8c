//! binst - install a release binary, verified
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Fetches an artifact over HTTP(S), checks it against a pinned digest and
//! renames the executable into place. Either the new binary is installed
//! with mode `0755`, or the destination is left exactly as it was.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.binst/       # or $BINST_HOME
//! └── bin/        # default install destination
//! ```

pub mod cmd;
pub mod exit;
pub mod ui;

pub use binst_core::paths::*;

use std::path::PathBuf;

use binst_schema::{ArtifactFormat, Digest, DigestAlgorithm};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "binst")]
#[command(author, version = env!("BINST_VERSION"), about = "binst - verified, atomic installs of release binaries")]
pub struct Cli {
    /// Show what install or clean would do without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Reject flag combinations clap cannot express, such as `--dry-run`
    /// on a command that has nothing to simulate.
    pub fn validate(&self) -> Result<(), clap::Error> {
        let name = match self.command {
            Commands::Verify { .. } => "verify",
            Commands::Hash { .. } => "hash",
            Commands::Install(_) | Commands::Clean { .. } => return Ok(()),
        };
        if self.dry_run {
            return Err(<Self as clap::CommandFactory>::command().error(
                clap::error::ErrorKind::ArgumentConflict,
                format!("--dry-run only applies to install and clean, not {name}"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch, verify and install an executable
    Install(InstallArgs),
    /// Smoke-test an installed executable
    Verify {
        /// Executable to run
        path: PathBuf,
        /// Argument to pass (repeatable; defaults to --version)
        #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Seconds to wait before killing the process
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
    /// Compute the digest of a file (for writing manifests)
    Hash {
        /// Digest algorithm
        #[arg(short, long, default_value = "sha256")]
        algorithm: DigestAlgorithm,
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove staging files left behind by interrupted installs
    Clean {
        /// Directory to clean (defaults to ~/.binst/bin)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Manifest file (TOML)
    #[arg(
        required_unless_present = "url",
        conflicts_with_all = ["url", "digest", "name"]
    )]
    pub manifest: Option<PathBuf>,

    /// Artifact URL
    #[arg(long, requires_all = ["digest", "name"])]
    pub url: Option<String>,

    /// Expected digest: sha256:<hex>, sha512:<hex>, blake3:<hex> or bare SHA-256 hex
    #[arg(long)]
    pub digest: Option<Digest>,

    /// Installed executable name
    #[arg(long)]
    pub name: Option<String>,

    /// Install directory (defaults to the manifest's, then ~/.binst/bin)
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Artifact format, detected from the URL when omitted
    #[arg(long)]
    pub format: Option<ArtifactFormat>,

    /// Version label recorded with the install
    #[arg(long = "version", value_name = "VERSION")]
    pub pkg_version: Option<String>,

    /// Fetch timeout in seconds
    #[arg(long, env = "BINST_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Run the installed executable with --version afterwards
    #[arg(long)]
    pub verify: bool,

    /// Print the installed artifact as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
