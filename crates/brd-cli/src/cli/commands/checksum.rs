//! `brd checksum` – digest of a local file.

use anyhow::Result;
use brd_core::checksum::{self, Algorithm};
use std::path::Path;

/// Print `<digest>  <path>`; SHA-256 digests carry the `sha256:` prefix the manifest expects.
pub fn run_checksum(path: &Path, algorithm: Algorithm) -> Result<()> {
    let digest = checksum::digest_path(algorithm, path)?;
    match algorithm {
        Algorithm::Sha1 => println!("{}  {}", digest, path.display()),
        Algorithm::Sha256 => println!("sha256:{}  {}", digest, path.display()),
    }
    Ok(())
}
