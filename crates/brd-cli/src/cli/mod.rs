//! CLI for BRD.

mod commands;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use brd_core::checksum::Algorithm;
use brd_core::config;
use std::path::Path;

use commands::{run_checksum, run_pack, PackArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "brd")]
#[command(
    about = "Download all releases from a manifest, package them and add an ops-file in order to use local-file as releases",
    long_about = "Download all releases from a manifest, package them and add an ops-file in order to use local-file as releases.\n\
This will package all of this (including ops-file) in a zip.\n\
Decompress zip and use local-release.yml to patch your existing manifest in order to use downloaded release."
)]
pub struct Cli {
    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DigestAlgo {
    Sha1,
    Sha256,
}

impl From<DigestAlgo> for Algorithm {
    fn from(a: DigestAlgo) -> Self {
        match a {
            DigestAlgo::Sha1 => Algorithm::Sha1,
            DigestAlgo::Sha256 => Algorithm::Sha256,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download, verify and package every release of a manifest into a zip.
    Pack {
        /// Path to the manifest (use - to load manifest from stdin).
        manifest: String,

        /// Place zip file to this path (use - to write to stdout).
        #[arg(long, short = 'o', value_name = "OUTPUT")]
        output: Option<String>,

        /// Concurrent downloads at same time (<= 0 means 3).
        #[arg(long, short = 'p', value_name = "PARALLEL", allow_negative_numbers = true)]
        parallel: Option<i64>,

        /// Skip TLS certificate verification.
        #[arg(long, short = 'k')]
        skip_insecure: bool,
    },

    /// Compute the digest of a file, for the manifest's sha1 field.
    Checksum {
        /// Path to the file.
        path: String,

        #[arg(long, value_enum, default_value = "sha1")]
        algo: DigestAlgo,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Pack {
                manifest,
                output,
                parallel,
                skip_insecure,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_pack(
                    &cfg,
                    PackArgs {
                        manifest,
                        output,
                        parallel,
                        skip_insecure,
                    },
                )?;
            }
            CliCommand::Checksum { path, algo } => run_checksum(Path::new(&path), algo.into())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
