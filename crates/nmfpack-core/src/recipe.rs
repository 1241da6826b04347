//! TOML build recipe parsing
//!
//! Human-readable descriptions of a package to assemble.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use nmfpack_schema::PackageType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or parsing a build recipe.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// An I/O error occurred while reading a recipe file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a valid recipe.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Identity of the package a recipe builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInfo {
    /// Package name; also the stem of the produced archive file.
    pub name: String,
    /// Package version string, opaque to the tooling.
    pub version: String,
    /// Declared package type. Omitting it records no type key, which
    /// downstream tooling reads as an app.
    #[serde(default, rename = "type")]
    pub kind: Option<PackageType>,
    /// Fixed build timestamp. The wall clock is stamped when omitted.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// App runtime settings recorded into the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeApp {
    /// Entry-point class name.
    #[serde(default)]
    pub mainclass: Option<String>,
    /// Main archive name.
    #[serde(default)]
    pub mainjar: Option<String>,
    /// Maximum heap size.
    #[serde(default)]
    pub maxheap: Option<String>,
    /// Minimum heap size.
    #[serde(default)]
    pub minheap: Option<String>,
    /// Dependency list, separator defined by the mission.
    #[serde(default)]
    pub dependencies: Option<String>,
}

/// One payload mapping: a file or directory on disk and where it lands in
/// the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMapping {
    /// Path on disk, resolved against the recipe's base directory.
    pub source: PathBuf,
    /// Archive path for a file, or archive prefix for a directory.
    /// Defaults to the source path with `/` separators.
    #[serde(default)]
    pub dest: Option<String>,
}

/// Complete build recipe combining identity, app settings, payload
/// mappings, and free-form extra manifest properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Identity of the package being built.
    pub package: RecipeInfo,
    /// App runtime settings.
    #[serde(default)]
    pub app: RecipeApp,
    /// Payload mappings, in archive order.
    #[serde(default)]
    pub files: Vec<FileMapping>,
    /// Extra manifest properties, applied after the typed fields.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Recipe {
    /// Parse a build recipe from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Io` if the file cannot be read, or
    /// `RecipeError::Parse` if the TOML content is invalid.
    pub fn from_file(path: &Path) -> Result<Self, RecipeError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a build recipe from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Parse` if the TOML content is invalid or does
    /// not match the expected schema.
    pub fn parse(content: &str) -> Result<Self, RecipeError> {
        Ok(toml::from_str(content)?)
    }
}

impl std::str::FromStr for Recipe {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
