//! Tests for the checksum subcommand.

use super::parse;
use crate::cli::{CliCommand, DigestAlgo};

#[test]
fn cli_parse_checksum_default_sha1() {
    match parse(&["brd", "checksum", "release.tgz"]).command {
        CliCommand::Checksum { path, algo } => {
            assert_eq!(path, "release.tgz");
            assert_eq!(algo, DigestAlgo::Sha1);
        }
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_checksum_sha256() {
    match parse(&["brd", "checksum", "release.tgz", "--algo", "sha256"]).command {
        CliCommand::Checksum { algo, .. } => assert_eq!(algo, DigestAlgo::Sha256),
        _ => panic!("expected Checksum with sha256"),
    }
}
