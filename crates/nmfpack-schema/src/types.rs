//! Leaf types shared between the manifest codec, the loader, and the CLI.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single entry of the manifest file list: an archive-relative path
/// paired with the integrity value of the file's contents.
///
/// The order of these entries inside a metadata record is significant --
/// it defines which positional manifest key each entry is serialized
/// under, and it must survive a load/store round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    /// Archive-relative path, using `/` separators regardless of host OS.
    pub path: String,
    /// CRC-32 of the file contents, widened to `u64` for header-safety.
    pub crc: u64,
}

impl PackageFile {
    /// Create a new checksum entry.
    pub fn new(path: impl Into<String>, crc: u64) -> Self {
        Self {
            path: path.into(),
            crc,
        }
    }
}

impl std::fmt::Display for PackageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.path, self.crc)
    }
}

/// What a package carries, as recorded under the `info.type` manifest key.
///
/// The type key only exists from metadata version 4 onward; earlier
/// generations implicitly carried apps. Unknown wire values are preserved
/// verbatim through [`PackageType::Other`] so that manifests written by a
/// newer tool round-trip without loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageType {
    /// A deployable application.
    App,
    /// A dependency bundle consumed by other packages.
    Dependency,
    /// A Java runtime update.
    JavaUpdate,
    /// A mission-specific platform update.
    MissionUpdate,
    /// An update of the framework itself.
    NmfUpdate,
    /// A type this build does not recognize, kept verbatim.
    Other(String),
}

impl PackageType {
    /// The wire value stored under `info.type`.
    pub fn as_wire(&self) -> &str {
        match self {
            PackageType::App => "app",
            PackageType::Dependency => "dependency",
            PackageType::JavaUpdate => "java",
            PackageType::MissionUpdate => "mission",
            PackageType::NmfUpdate => "nmf",
            PackageType::Other(s) => s,
        }
    }

    /// Parse a wire value. Never fails: unrecognized values are retained
    /// as [`PackageType::Other`].
    pub fn from_wire(s: &str) -> Self {
        match s {
            "app" => PackageType::App,
            "dependency" => PackageType::Dependency,
            "java" => PackageType::JavaUpdate,
            "mission" => PackageType::MissionUpdate,
            "nmf" => PackageType::NmfUpdate,
            other => PackageType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

impl Serialize for PackageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for PackageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(PackageType::from_wire(&s))
    }
}
