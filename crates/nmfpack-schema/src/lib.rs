//! Shared types and wire format for nmfpack.
//!
//! Everything in this crate is consumed by both the core library (manifest
//! codec, archive loader) and the CLI: the checksum-entry type that backs
//! the manifest file list, the package-type wire enum, and the CRC-32
//! helpers used wherever file integrity values are produced or checked.

pub mod crc;
pub mod types;

// Re-exports
pub use types::{PackageFile, PackageType};

/// Canonical path separator inside package archives.
///
/// Manifest file paths always use `/`, independent of the host OS.
pub const ARCHIVE_SEPARATOR: char = '/';
