//! `brd pack` – download every manifest release into one zip.

use anyhow::Result;
use brd_core::bundle::{bundle, Output};
use brd_core::config::BrdConfig;
use brd_core::release::{read_manifest_source, Manifest};

use crate::cli::progress::TerminalProgress;

/// Flags of the pack command; each one overrides the config file.
#[derive(Debug, Clone)]
pub struct PackArgs {
    pub manifest: String,
    pub output: Option<String>,
    pub parallel: Option<i64>,
    pub skip_insecure: bool,
}

fn effective_config(cfg: &BrdConfig, args: &PackArgs) -> BrdConfig {
    let mut cfg = cfg.clone();
    if let Some(parallel) = args.parallel {
        cfg.parallel = parallel;
    }
    if args.skip_insecure {
        cfg.http.skip_insecure = true;
    }
    cfg
}

pub fn run_pack(cfg: &BrdConfig, args: PackArgs) -> Result<()> {
    let cfg = effective_config(cfg, &args);
    let bytes = read_manifest_source(&args.manifest)?;
    let manifest = Manifest::from_yaml(&bytes)?;
    let output = Output::resolve(args.output.as_deref(), &manifest)?;

    let progress = TerminalProgress::new();
    let summary = bundle(&manifest, &output, &cfg, &progress)?;

    // stdout may carry the archive itself
    match summary.path {
        Some(path) => eprintln!("Done: zip file written to {}", path.display()),
        None => eprintln!("Done: zip file written to stdout"),
    }
    Ok(())
}
