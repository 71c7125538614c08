// Desktop tool: unwrap/expect/panic acceptable outside the library crates.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod cli;
mod convert;
mod fix;
mod report;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Mode};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if !cli.path.exists() {
        bail!("cannot access {}", cli.path.display());
    }

    match cli.mode()? {
        Mode::Fix(options) => {
            let summary = fix::run(&cli.path, &options)?;
            if cli.json {
                report::print_json(&summary)?;
            } else {
                summary.print();
            }
            if !summary.failed.is_empty() {
                bail!("{} file(s) could not be processed", summary.failed.len());
            }
        }
        Mode::Convert {
            output,
            prune,
            encoder,
        } => {
            let report = convert::run(&cli.path, &output, prune, encoder)
                .with_context(|| format!("converting {}", cli.path.display()))?;
            if cli.json {
                report::print_json(&report)?;
            } else {
                report::print_sync(&report);
            }
            if !report.is_success() {
                bail!("Opus mirror finished with failures");
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
