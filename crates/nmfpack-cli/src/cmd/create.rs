//! Create command

use std::path::Path;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use nmfpack_core::creator;
use nmfpack_core::recipe::Recipe;

/// Build a package archive from a recipe file.
///
/// Payload sources resolve against `base_dir` when given, the recipe's
/// own directory otherwise.
pub fn create(recipe_path: &Path, base_dir: Option<&Path>, out_dir: &Path) -> Result<()> {
    let recipe = Recipe::from_file(recipe_path)
        .with_context(|| format!("loading recipe {}", recipe_path.display()))?;

    let base = base_dir.unwrap_or_else(|| recipe_path.parent().unwrap_or(Path::new(".")));
    tracing::debug!(
        "Packaging {} {} from {}",
        recipe.package.name,
        recipe.package.version,
        recipe_path.display()
    );

    let out = creator::create_package(&recipe, base, out_dir)?;
    println!("  {} {}", "packaged".green().bold(), out.display());
    Ok(())
}
