//! Compare command

use std::path::Path;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use nmfpack_core::metadata::Metadata;
use nmfpack_core::{archive, update};

/// Report whether two archives carry the same release.
pub fn compare(candidate_path: &Path, installed_path: &Path) -> Result<()> {
    tracing::debug!(
        "Comparing {} against {}",
        candidate_path.display(),
        installed_path.display()
    );
    let candidate = archive::load_from_path(candidate_path)
        .with_context(|| format!("loading {}", candidate_path.display()))?;
    let installed = archive::load_from_path(installed_path)
        .with_context(|| format!("loading {}", installed_path.display()))?;

    let lw = 12;
    println!();
    print_identity(lw, "candidate", &candidate);
    print_identity(lw, "installed", &installed);
    println!();

    if update::is_update(&candidate, &installed)? {
        println!("  {}", "different release (update)".yellow().bold());
    } else {
        println!("  {}", "same release".green().bold());
    }
    Ok(())
}

fn print_identity(lw: usize, label: &str, record: &Metadata) {
    println!(
        "  {label:<lw$}{} {} ({})",
        record.name().unwrap_or("?"),
        record.version().unwrap_or("?"),
        record.timestamp().unwrap_or("?"),
    );
}
