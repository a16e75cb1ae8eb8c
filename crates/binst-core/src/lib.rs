//! binst core: verified fetch and atomic install of release binaries.
//!
//! ```no_run
//! use binst_core::{Installer, InstallOptions};
//! use binst_schema::{Digest, InstallSpec};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = InstallSpec::new(
//!     "https://github.com/mcncl/bap/releases/download/v0.1.0/bap-0.1.0-arm64-apple-darwin.tar.gz",
//!     Digest::parse("sha256:44af0a5b679a69c9398e7cfecce72bcdc1e13804a6a9cf28f6c5be16cefef493")?,
//!     "/opt/bin",
//!     "bap",
//! )?;
//! let artifact = Installer::new(InstallOptions::default())?.install(&spec).await?;
//! println!("installed {}", artifact.path.display());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod install;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod reporter;
pub mod smoke;

pub use error::{ErrorKind, FetchError, InstallError, IntegrityError};
pub use install::{DEFAULT_TIMEOUT, InstallOptions, Installer, install};
pub use manifest::{InstallManifest, ManifestError};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for outgoing requests
pub const USER_AGENT: &str = concat!("binst/", env!("CARGO_PKG_VERSION"));
