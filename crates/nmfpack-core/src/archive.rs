//! Container access and the two-step manifest lookup.
//!
//! Packages are zip containers. This module owns the seam to them: a
//! minimal [`PackageArchive`] trait covering exactly what manifest loading
//! needs (entry existence, sequential entry reads), the lookup that tries
//! the current manifest entry first and the legacy receipt second, and the
//! errors either step can surface.
//!
//! The lookup result is the explicit [`LocatedManifest`] variant rather
//! than an error-driven retry, so callers that care which generation of
//! container they are holding can tell. [`load`] collapses the variants
//! for callers that only want a record.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::metadata::{METADATA_FILENAME, Metadata, MetadataError};
use crate::receipt::{self, RECEIPT_FILENAME, ReceiptError};

/// Read access to a package container.
///
/// The subsystem needs only two operations from its container. Implemented
/// for [`ZipArchive`] over any seekable reader; tests substitute in-memory
/// containers through the same trait.
pub trait PackageArchive {
    /// Whether an entry with exactly this name exists.
    fn contains(&self, name: &str) -> bool;

    /// Read the full contents of the named entry.
    fn read_entry(&mut self, name: &str) -> io::Result<Vec<u8>>;
}

impl<R: Read + Seek> PackageArchive for ZipArchive<R> {
    fn contains(&self, name: &str) -> bool {
        self.index_for_name(name).is_some()
    }

    fn read_entry(&mut self, name: &str) -> io::Result<Vec<u8>> {
        let mut entry = self.by_name(name).map_err(zip_to_io)?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

fn zip_to_io(err: ZipError) -> io::Error {
    match err {
        ZipError::Io(err) => err,
        ZipError::FileNotFound => io::Error::new(io::ErrorKind::NotFound, "no such entry"),
        other => io::Error::other(other),
    }
}

/// Outcome of the two-step manifest lookup.
#[derive(Debug)]
pub enum LocatedManifest {
    /// The current-format manifest entry was present and parsed.
    Current(Metadata),
    /// Only the legacy receipt was present; this is its adaptation.
    Legacy(Metadata),
    /// Neither entry exists in the container.
    NotFound,
}

/// Errors from loading a manifest out of a package container.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Neither the current manifest entry nor the legacy receipt exists.
    #[error("package carries no manifest entry")]
    ManifestNotFound,

    /// The current manifest entry exists but cannot be parsed.
    #[error("malformed `{entry}` entry")]
    MalformedManifest {
        /// Name of the offending archive entry.
        entry: &'static str,
        /// What the codec rejected.
        #[source]
        source: MetadataError,
    },

    /// The legacy receipt entry exists but cannot be parsed.
    #[error("malformed `{entry}` entry")]
    MalformedReceipt {
        /// Name of the offending archive entry.
        entry: &'static str,
        /// What the adapter rejected.
        #[source]
        source: ReceiptError,
    },

    /// Container access failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Look for a manifest in the container.
///
/// Tries the current entry name first, the legacy receipt second, and
/// reports [`LocatedManifest::NotFound`] when both are absent. The legacy
/// step runs only when the current entry is missing, never as recovery
/// from a parse failure.
///
/// # Errors
///
/// Parse failures of whichever entry was found, with the entry name
/// attached; container I/O errors propagate unchanged.
pub fn locate<A: PackageArchive + ?Sized>(archive: &mut A) -> Result<LocatedManifest, LoadError> {
    if archive.contains(METADATA_FILENAME) {
        let bytes = archive.read_entry(METADATA_FILENAME)?;
        let record =
            Metadata::from_bytes(&bytes).map_err(|source| LoadError::MalformedManifest {
                entry: METADATA_FILENAME,
                source,
            })?;
        return Ok(LocatedManifest::Current(record));
    }

    if archive.contains(RECEIPT_FILENAME) {
        tracing::debug!("no `{METADATA_FILENAME}` entry, trying the legacy receipt");
        let bytes = archive.read_entry(RECEIPT_FILENAME)?;
        let record = receipt::parse(&bytes).map_err(|source| LoadError::MalformedReceipt {
            entry: RECEIPT_FILENAME,
            source,
        })?;
        return Ok(LocatedManifest::Legacy(record));
    }

    Ok(LocatedManifest::NotFound)
}

/// Load the manifest from the container, whichever generation wrote it.
///
/// # Errors
///
/// [`LoadError::ManifestNotFound`] when the container has neither entry;
/// otherwise as [`locate`].
pub fn load<A: PackageArchive + ?Sized>(archive: &mut A) -> Result<Metadata, LoadError> {
    match locate(archive)? {
        LocatedManifest::Current(record) | LocatedManifest::Legacy(record) => Ok(record),
        LocatedManifest::NotFound => Err(LoadError::ManifestNotFound),
    }
}

/// Run the two-step lookup against a package file on disk.
///
/// # Errors
///
/// As [`locate`], plus I/O errors from opening the file or reading the
/// container directory.
pub fn locate_from_path(path: &Path) -> Result<LocatedManifest, LoadError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(zip_to_io)?;
    locate(&mut archive)
}

/// Open a package file and load its manifest, whichever generation wrote
/// it.
///
/// # Errors
///
/// As [`load`].
pub fn load_from_path(path: &Path) -> Result<Metadata, LoadError> {
    match locate_from_path(path)? {
        LocatedManifest::Current(record) | LocatedManifest::Legacy(record) => Ok(record),
        LocatedManifest::NotFound => Err(LoadError::ManifestNotFound),
    }
}
