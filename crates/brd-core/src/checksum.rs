//! Opt-in integrity verification of downloaded releases.
//!
//! Manifests carry a `sha1` field; an empty value disables verification.
//! Values prefixed with `sha256:` are checked with SHA-256 instead.

use anyhow::{Context, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PackError;

const BUF_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
}

impl Algorithm {
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
        }
    }
}

/// Digest expected by the manifest for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest {
    pub algorithm: Algorithm,
    pub hex: String,
}

impl ExpectedDigest {
    /// Parse a manifest `sha1` value. Returns `None` when the value is empty.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match value.strip_prefix("sha256:") {
            Some(hex) => Some(Self {
                algorithm: Algorithm::Sha256,
                hex: hex.to_string(),
            }),
            None => Some(Self {
                algorithm: Algorithm::Sha1,
                hex: value.to_string(),
            }),
        }
    }

    /// Hash `reader` to the end and compare against the expected hex digest.
    /// The comparison is exact on the hex text; digests are emitted lowercase.
    pub fn verify<R: Read>(&self, reader: R) -> Result<(), PackError> {
        let actual = digest_reader(self.algorithm, reader)?;
        if actual != self.hex {
            return Err(PackError::Integrity {
                algorithm: self.algorithm.label(),
                expected: self.hex.clone(),
                actual,
            });
        }
        Ok(())
    }
}

/// Compute the digest of everything `reader` yields, as lowercase hex.
pub fn digest_reader<R: Read>(algorithm: Algorithm, reader: R) -> std::io::Result<String> {
    match algorithm {
        Algorithm::Sha1 => hash_with::<Sha1, R>(reader),
        Algorithm::Sha256 => hash_with::<Sha256, R>(reader),
    }
}

fn hash_with<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the digest of a file on disk.
pub fn digest_path(algorithm: Algorithm, path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    digest_reader(algorithm, f).with_context(|| format!("read {}", path.display()))
}
