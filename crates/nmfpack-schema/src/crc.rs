//! CRC-32 integrity helpers.
//!
//! Manifest checksums are CRC-32 values carried as `u64`. The serialized
//! form stores them as decimal strings and compares them as plain
//! integers, so the carrier must hold the full unsigned 32-bit range.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crc32fast::Hasher;

/// Read buffer size for streaming checksum computation.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the CRC-32 of an in-memory byte slice.
pub fn compute(data: &[u8]) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    u64::from(hasher.finalize())
}

/// Compute the CRC-32 of everything a reader yields, streaming in fixed
/// chunks so that large payloads never have to fit in memory.
///
/// # Errors
///
/// Returns any I/O error raised by the reader.
pub fn compute_reader<R: Read>(mut reader: R) -> io::Result<u64> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(u64::from(hasher.finalize()))
}

/// Compute the CRC-32 of a file on disk.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn compute_file(path: &Path) -> io::Result<u64> {
    let file = File::open(path)?;
    compute_reader(BufReader::new(file))
}
