//! Algorithm-tagged content digests.
//!
//! A [`Digest`] is written as `<algorithm>:<hex>` (e.g. `sha256:44af...`).
//! Untagged hex is accepted as SHA-256, which is how package formulas
//! usually declare their checksum.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use thiserror::Error;

/// Errors produced while parsing a digest string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The digest string (or its hex part) is empty.
    #[error("Empty digest")]
    Empty,

    /// The algorithm tag is not one we can compute.
    #[error("Unsupported digest algorithm: '{0}'")]
    UnknownAlgorithm(String),

    /// The hex part has the wrong length for the declared algorithm.
    #[error("Invalid {algorithm} digest: expected {expected} hex characters, got {actual}")]
    InvalidLength {
        /// Algorithm named by the tag.
        algorithm: DigestAlgorithm,
        /// Hex length the algorithm produces.
        expected: usize,
        /// Hex length that was supplied.
        actual: usize,
    },

    /// The hex part contains a non-hex character.
    #[error("Invalid {0} digest: contains non-hex characters")]
    NonHex(DigestAlgorithm),
}

/// Hash functions supported for artifact verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256 (default; what formulas declare).
    #[default]
    Sha256,
    /// SHA-512.
    Sha512,
    /// BLAKE3 with the default 32-byte output.
    Blake3,
}

impl DigestAlgorithm {
    /// Tag used in the `<algorithm>:<hex>` form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Number of hex characters in a digest of this algorithm.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(DigestError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// A validated, algorithm-tagged digest.
///
/// The hex part is normalised to lowercase on parse, so two digests compare
/// equal regardless of the case they were written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: DigestAlgorithm,
    hex: String,
}

impl Digest {
    /// Parse `<algorithm>:<hex>`, or bare hex as SHA-256.
    ///
    /// # Errors
    ///
    /// Returns a [`DigestError`] if the input is empty, names an unknown
    /// algorithm, or the hex part has the wrong length or characters.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DigestError::Empty);
        }

        let (algorithm, hex) = match s.split_once(':') {
            Some((tag, hex)) => (tag.parse::<DigestAlgorithm>()?, hex),
            None => (DigestAlgorithm::Sha256, s),
        };

        if hex.is_empty() {
            return Err(DigestError::Empty);
        }
        if hex.len() != algorithm.hex_len() {
            return Err(DigestError::InvalidLength {
                algorithm,
                expected: algorithm.hex_len(),
                actual: hex.len(),
            });
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex(algorithm));
        }

        Ok(Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Compute the digest of an in-memory buffer.
    pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let mut hasher = DigestHasher::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Compute the digest of everything readable from `reader` (streaming).
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the reader.
    pub fn compute_reader<R: Read>(algorithm: DigestAlgorithm, mut reader: R) -> io::Result<Self> {
        let mut hasher = DigestHasher::new(algorithm);
        let mut buffer = vec![0u8; 64 * 1024];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize())
    }

    /// The algorithm this digest was produced with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Lowercase hex without the algorithm tag.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

/// Incremental hasher for any [`DigestAlgorithm`].
#[derive(Debug, Clone)]
pub enum DigestHasher {
    /// SHA-256 state.
    Sha256(Sha256),
    /// SHA-512 state.
    Sha512(Sha512),
    /// BLAKE3 state (boxed, the hasher is large).
    Blake3(Box<blake3::Hasher>),
}

impl DigestHasher {
    /// Start a new hash computation.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        use sha2::Digest as _;

        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) {
        use sha2::Digest as _;

        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Finish and produce the tagged digest.
    pub fn finalize(self) -> Digest {
        use sha2::Digest as _;

        let (algorithm, hex) = match self {
            Self::Sha256(h) => (DigestAlgorithm::Sha256, hex::encode(h.finalize())),
            Self::Sha512(h) => (DigestAlgorithm::Sha512, hex::encode(h.finalize())),
            Self::Blake3(h) => (DigestAlgorithm::Blake3, h.finalize().to_hex().to_string()),
        };
        Digest { algorithm, hex }
    }
}
