//! nmfpack CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nmfpack_cli::cmd;
use nmfpack_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            recipe,
            base_dir,
            out,
        } => cmd::create::create(&recipe, base_dir.as_deref(), &out),
        Commands::Info { package, json } => cmd::info::info(&package, json),
        Commands::Verify { package } => cmd::verify::verify(&package),
        Commands::Compare {
            candidate,
            installed,
        } => cmd::compare::compare(&candidate, &installed),
    }
}
