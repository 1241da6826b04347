//! Adapter for the pre-generation-4 receipt descriptor.
//!
//! Before the current manifest format, package archives carried a
//! line-oriented receipt entry, `label: value` in a fixed order, with the
//! field set gated by the generation named on the first line. Three
//! generations shipped: the earliest receipts recorded only the identity
//! triple and the entry-point class; generation 2 added the main archive
//! name, the heap ceiling and the checksummed file list; generation 3
//! added the heap floor.
//!
//! The adapter is read-only. It maps a receipt onto a current-format
//! [`Metadata`] record carrying the receipt's own generation as the
//! metadata version, so every version-gated behavior downstream treats the
//! result as the pre-typing era package it is. Nothing writes receipts
//! anymore.

use nmfpack_schema::PackageFile;
use thiserror::Error;

use crate::metadata::Metadata;

/// Entry name of the legacy receipt inside a package archive.
pub const RECEIPT_FILENAME: &str = "NMF_Package_Receipt";

const GENERATION_EARLIEST: u32 = 1;
const GENERATION_LATEST: u32 = 3;

const LABEL_GENERATION: &str = "receipt-version";
const LABEL_NAME: &str = "package-name";
const LABEL_VERSION: &str = "package-version";
const LABEL_TIMESTAMP: &str = "creation-timestamp";
const LABEL_MAINCLASS: &str = "app-mainclass";
const LABEL_MAINJAR: &str = "app-mainjar";
const LABEL_MAXHEAP: &str = "app-maxheap";
const LABEL_MINHEAP: &str = "app-minheap";
const LABEL_FILE_COUNT: &str = "file-count";
const LABEL_FILE_PATH: &str = "file-path";
const LABEL_FILE_CRC: &str = "file-crc";

/// Errors from parsing a legacy receipt entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// The receipt bytes are not valid UTF-8.
    #[error("receipt text is not valid UTF-8")]
    NotUtf8,

    /// The receipt ended before a required entry.
    #[error("line {line}: receipt ends before `{expected}` entry")]
    MissingEntry {
        /// One-based line number where the entry was expected.
        line: usize,
        /// Label of the missing entry.
        expected: &'static str,
    },

    /// A line carries a different label than the fixed order requires.
    #[error("line {line}: expected `{expected}`, found `{found}`")]
    UnexpectedLabel {
        /// One-based line number of the offending line.
        line: usize,
        /// Label required at this position.
        expected: &'static str,
        /// Label (or unlabeled text) actually present.
        found: String,
    },

    /// The first line names a generation this adapter does not know.
    #[error("unsupported receipt generation {0}")]
    UnsupportedGeneration(u32),

    /// A numeric entry holds a value that does not parse.
    #[error("line {line}: invalid value `{value}` for `{label}`")]
    InvalidValue {
        /// One-based line number of the offending line.
        line: usize,
        /// Label of the entry.
        label: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}

/// Parse a legacy receipt into a current-format metadata record.
///
/// The returned record carries the receipt generation as its metadata
/// version and no package type, so [`Metadata::is_app_package`] holds for
/// it unconditionally. Generation 1 receipts predate file tracking; their
/// records report an empty file list.
///
/// # Errors
///
/// Any [`ReceiptError`], each naming the offending line.
pub fn parse(bytes: &[u8]) -> Result<Metadata, ReceiptError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ReceiptError::NotUtf8)?;
    let mut cursor = Cursor::new(text);

    let generation: u32 = cursor.take_number(LABEL_GENERATION)?;
    if !(GENERATION_EARLIEST..=GENERATION_LATEST).contains(&generation) {
        return Err(ReceiptError::UnsupportedGeneration(generation));
    }

    let mut builder = Metadata::builder()
        .metadata_version(generation)
        .name(cursor.take(LABEL_NAME)?)
        .version(cursor.take(LABEL_VERSION)?)
        .timestamp(cursor.take(LABEL_TIMESTAMP)?)
        .main_class(cursor.take(LABEL_MAINCLASS)?);

    if generation >= 2 {
        builder = builder
            .main_jar(cursor.take(LABEL_MAINJAR)?)
            .max_heap(cursor.take(LABEL_MAXHEAP)?);
    }
    if generation >= 3 {
        builder = builder.min_heap(cursor.take(LABEL_MINHEAP)?);
    }
    if generation >= 2 {
        let count: usize = cursor.take_number(LABEL_FILE_COUNT)?;
        let mut files = Vec::new();
        for _ in 0..count {
            let path = cursor.take(LABEL_FILE_PATH)?.to_string();
            let crc: u64 = cursor.take_number(LABEL_FILE_CRC)?;
            files.push(PackageFile::new(path, crc));
        }
        builder = builder.files(files);
    }

    Ok(builder.build())
}

/// Fixed-order line reader over receipt text.
struct Cursor<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
        }
    }

    /// Return the value of the next non-blank line, which must carry
    /// `label`.
    fn take(&mut self, label: &'static str) -> Result<&'a str, ReceiptError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Err(ReceiptError::MissingEntry {
                    line: self.line_no + 1,
                    expected: label,
                });
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            let Some((found, value)) = line.split_once(':') else {
                return Err(ReceiptError::UnexpectedLabel {
                    line: self.line_no,
                    expected: label,
                    found: line.trim().to_string(),
                });
            };
            if found != label {
                return Err(ReceiptError::UnexpectedLabel {
                    line: self.line_no,
                    expected: label,
                    found: found.to_string(),
                });
            }
            return Ok(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    fn take_number<T: std::str::FromStr>(&mut self, label: &'static str) -> Result<T, ReceiptError> {
        let value = self.take(label)?;
        value.parse().map_err(|_| ReceiptError::InvalidValue {
            line: self.line_no,
            label,
            value: value.to_string(),
        })
    }
}
