//! nmfpack - NMF package tooling
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Command-line interface over the package metadata subsystem: build an
//! archive from a TOML recipe, inspect a package's manifest (including
//! pre-generation-4 archives carrying the legacy receipt), recompute and
//! check payload checksums, and decide whether two archives are the same
//! release.

pub mod cmd;

pub use nmfpack_core::archive;
pub use nmfpack_core::recipe::Recipe;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level argument parser for the `nmfpack` binary.
#[derive(Debug, Parser)]
#[command(name = "nmfpack")]
#[command(author, version, about = "nmfpack - NMF package build and inspection tooling")]
pub struct Cli {
    /// The selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// All `nmfpack` subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a package archive from a recipe
    Create {
        /// Recipe file (TOML)
        recipe: PathBuf,
        /// Directory payload sources resolve against (defaults to the
        /// recipe's directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Output directory for the archive
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Show the manifest of a package archive
    Info {
        /// Package archive
        package: PathBuf,
        /// Emit a JSON report instead of the table
        #[arg(long)]
        json: bool,
    },
    /// Recompute payload checksums and compare them with the manifest
    Verify {
        /// Package archive
        package: PathBuf,
    },
    /// Decide whether two archives are the same release
    Compare {
        /// Candidate package archive
        candidate: PathBuf,
        /// Installed package archive
        installed: PathBuf,
    },
}
