//! Incremental digests over streamed content.

use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};

use crate::error::ServiceError;

/// Fed each chunk in delivery order.
pub trait DigestAccumulator: Send {
    fn update(&mut self, chunk: &[u8]);

    /// Lowercase hex of everything seen so far.
    fn checksum(&self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct ChecksumStream<D> {
    digest: D,
}

impl<D: Digest> ChecksumStream<D> {
    #[must_use]
    pub fn new() -> Self {
        Self { digest: D::new() }
    }
}

impl<D: Digest + Clone + Send> DigestAccumulator for ChecksumStream<D> {
    fn update(&mut self, chunk: &[u8]) {
        Digest::update(&mut self.digest, chunk);
    }

    fn checksum(&self) -> String {
        hex::encode(self.digest.clone().finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    #[must_use]
    pub fn accumulator(self) -> Box<dyn DigestAccumulator> {
        match self {
            Self::Sha256 => Box::new(ChecksumStream::<Sha256>::new()),
            Self::Sha512 => Box::new(ChecksumStream::<Sha512>::new()),
        }
    }

    /// One-shot digest of `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(ServiceError::InvalidConfiguration(format!(
                "Unsupported checksum type '{other}'"
            ))),
        }
    }
}
