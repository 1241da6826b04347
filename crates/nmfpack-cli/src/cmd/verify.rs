//! Verify command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;
use nmfpack_core::archive::{self, PackageArchive};
use nmfpack_schema::crc;
use zip::ZipArchive;

/// Recompute every payload checksum and compare it against the manifest.
pub fn verify(package: &Path) -> Result<()> {
    let record = archive::load_from_path(package)
        .with_context(|| format!("loading {}", package.display()))?;
    let files = record.files()?;
    tracing::debug!(
        "Verifying {} payload entries in {}",
        files.len(),
        package.display()
    );

    let file =
        File::open(package).with_context(|| format!("opening {}", package.display()))?;
    let mut zip =
        ZipArchive::new(file).with_context(|| format!("reading {}", package.display()))?;

    println!();
    let mut failures = 0usize;
    for entry in files {
        if !zip.contains(&entry.path) {
            println!("  {} {} missing from the archive", "✗".red(), entry.path);
            failures += 1;
            continue;
        }
        let bytes = zip
            .read_entry(&entry.path)
            .with_context(|| format!("reading archive entry `{}`", entry.path))?;
        let found = crc::compute(&bytes);
        if found == entry.crc {
            println!("  {} {}", "✓".green(), entry.path);
        } else {
            println!(
                "  {} {} expected {} found {found}",
                "✗".red(),
                entry.path,
                entry.crc
            );
            failures += 1;
        }
    }
    println!();

    if failures > 0 {
        bail!(
            "{failures} of {} payload entries failed verification",
            files.len()
        );
    }
    println!("  {} {} entries verified", "ok".green().bold(), files.len());
    Ok(())
}
