use brd_core::logging;
use clap::Parser;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Log to the state dir; fall back to stderr if it is not writable.
    if let Err(e) = logging::init_logging(cli.verbose) {
        logging::init_logging_stderr(cli.verbose);
        tracing::warn!("log file unavailable ({}), logging to stderr", e);
    }

    if let Err(err) = cli.run() {
        eprintln!("brd error: {:#}", err);
        std::process::exit(1);
    }
}
