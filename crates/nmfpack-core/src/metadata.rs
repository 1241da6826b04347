//! The package manifest record and its wire form.
//!
//! A [`Metadata`] record describes one deployable package: the identity
//! triple (name, version, creation timestamp), the format generation, the
//! package type, app runtime settings, and the checksummed file list. On
//! disk it is the `package-metadata.properties` entry of the package
//! archive, encoded through [`crate::props`].
//!
//! Records come from two places. Build tooling constructs them fresh with
//! [`Metadata::builder`] and serializes with [`Metadata::to_bytes`].
//! Install tooling decodes archive entries with [`Metadata::from_bytes`],
//! where unrecognized keys are retained and re-emitted verbatim so newer
//! manifests survive older tools.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use nmfpack_schema::{PackageFile, PackageType};
use thiserror::Error;

use crate::props::{self, PropsError};

/// Entry name of the current-format manifest inside a package archive.
pub const METADATA_FILENAME: &str = "package-metadata.properties";

/// Latest manifest format generation written by this crate.
pub const METADATA_VERSION_LATEST: u32 = 4;

/// First generation that records an explicit package type.
const METADATA_VERSION_TYPED: u32 = 4;

/// Wire key of the build timestamp.
pub const PACKAGE_TIMESTAMP: &str = "info.creation-timestamp";
/// Wire key of the manifest format generation.
pub const PACKAGE_METADATA_VERSION: &str = "info.metadata-version";
/// Wire key of the package name.
pub const PACKAGE_NAME: &str = "info.name";
/// Wire key of the package version string.
pub const PACKAGE_VERSION: &str = "info.version";
/// Wire key of the package type.
pub const PACKAGE_TYPE: &str = "info.type";
/// Wire key of the app entry-point class.
pub const APP_MAINCLASS: &str = "pack.app.mainclass";
/// Wire key of the app main archive name.
pub const APP_MAINJAR: &str = "pack.app.mainjar";
/// Wire key of the app maximum heap size.
pub const APP_MAXHEAP: &str = "pack.app.maxheap";
/// Wire key of the app minimum heap size.
pub const APP_MINHEAP: &str = "pack.app.minheap";
/// Wire key of the app dependency list.
pub const APP_DEPENDENCIES: &str = "pack.app.dependencies";
/// Wire key of the payload entry count.
pub const FILE_COUNT: &str = "zipped.file.count";
/// Prefix of the positional payload path keys, `zipped.file.path.<i>`.
pub const FILE_PATH: &str = "zipped.file.path";
/// Prefix of the positional payload checksum keys, `zipped.file.crc.<i>`.
pub const FILE_CRC: &str = "zipped.file.crc";

/// Errors from decoding or interrogating a metadata record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The byte stream is not flat key-value text.
    #[error("malformed manifest: {0}")]
    Malformed(#[from] PropsError),

    /// A required identity field is absent from the record.
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    /// The declared file count disagrees with the positional pairs present.
    #[error("inconsistent file list: {declared} declared, {found} present")]
    InconsistentFileList {
        /// Value of the count key.
        declared: usize,
        /// Number of complete positional pairs actually present.
        found: usize,
    },

    /// A recognized key holds a value its type refuses.
    #[error("invalid value `{value}` for `{key}`")]
    InvalidField {
        /// The offending wire key.
        key: String,
        /// The raw value that failed to parse.
        value: String,
    },
}

/// App runtime settings carried under the `pack.app.*` keys.
///
/// Meaningful only when the record [is an app
/// package](Metadata::is_app_package); all fields are optional strings,
/// opaque to this crate.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    main_class: Option<String>,
    main_jar: Option<String>,
    max_heap: Option<String>,
    min_heap: Option<String>,
    dependencies: Option<String>,
}

impl AppSettings {
    /// Entry-point class name.
    pub fn main_class(&self) -> Option<&str> {
        self.main_class.as_deref()
    }

    /// Main archive name.
    pub fn main_jar(&self) -> Option<&str> {
        self.main_jar.as_deref()
    }

    /// Maximum heap size, as written.
    pub fn max_heap(&self) -> Option<&str> {
        self.max_heap.as_deref()
    }

    /// Minimum heap size, as written.
    pub fn min_heap(&self) -> Option<&str> {
        self.min_heap.as_deref()
    }

    /// Dependency list with a caller-defined separator.
    pub fn dependencies(&self) -> Option<&str> {
        self.dependencies.as_deref()
    }
}

/// One package manifest.
///
/// Identity and version fields are fixed at construction; the only
/// post-construction mutation is [`add_property`](Metadata::add_property),
/// intended for the single-threaded build phase. The file list may be
/// supplied up front or materialized lazily from the positional keys on
/// first access; either way it is computed at most once per record.
#[derive(Debug, Clone)]
pub struct Metadata {
    metadata_version: Option<u32>,
    name: Option<String>,
    version: Option<String>,
    timestamp: Option<String>,
    package_type: Option<PackageType>,
    app: AppSettings,
    extra: BTreeMap<String, String>,
    files: OnceLock<Result<Vec<PackageFile>, MetadataError>>,
}

impl Metadata {
    /// Start building a fresh record.
    pub fn builder() -> MetadataBuilder {
        MetadataBuilder::default()
    }

    /// Decode a record from manifest bytes.
    ///
    /// Tolerant of any key set: recognized keys are lifted into typed
    /// fields, everything else lands in the extra map and survives a
    /// subsequent [`to_bytes`](Metadata::to_bytes) verbatim. No version is
    /// injected when the version key is absent.
    ///
    /// # Errors
    ///
    /// [`MetadataError::Malformed`] when the bytes are not flat key-value
    /// text, [`MetadataError::InvalidField`] when the version key is
    /// present but not a non-negative integer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        Self::from_props(props::read(bytes)?)
    }

    /// Encode the record to canonical manifest bytes.
    ///
    /// Keys are emitted in sorted order, so the same logical record always
    /// encodes byte-identically. A record whose version was never set is
    /// stamped with [`METADATA_VERSION_LATEST`]; an explicitly set version
    /// is never overwritten.
    pub fn to_bytes(&self) -> Vec<u8> {
        props::write(&self.to_props()).into_bytes()
    }

    /// Write the encoded record to a standalone file, creating parent
    /// directories as needed.
    pub fn store(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes())
    }

    /// Manifest format generation, if recorded.
    pub fn metadata_version(&self) -> Option<u32> {
        self.metadata_version
    }

    /// Package name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Package version string, opaque to this crate.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Build timestamp, opaque to this crate.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Declared package type, if recorded.
    pub fn package_type(&self) -> Option<&PackageType> {
        self.package_type.as_ref()
    }

    /// App runtime settings.
    pub fn app(&self) -> &AppSettings {
        &self.app
    }

    /// Keys not recognized by the typed accessors, preserved verbatim.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Whether this record describes an app package.
    ///
    /// Records older than generation 4 predate the type key and are all
    /// apps. From generation 4 on, the type key decides; its absence still
    /// means app.
    pub fn is_app_package(&self) -> bool {
        match self.metadata_version {
            Some(version) if version >= METADATA_VERSION_TYPED => {
                matches!(self.package_type, None | Some(PackageType::App))
            }
            _ => true,
        }
    }

    /// The checksummed file list.
    ///
    /// A construction-supplied list is returned as-is. Otherwise the list
    /// is materialized from the count and positional keys on first call
    /// and cached; concurrent first calls race safely and every caller
    /// observes the same fully populated slice.
    ///
    /// # Errors
    ///
    /// [`MetadataError::InconsistentFileList`] when the declared count
    /// disagrees with the positional pairs present, in either direction;
    /// [`MetadataError::InvalidField`] when the count or a checksum does
    /// not parse.
    pub fn files(&self) -> Result<&[PackageFile], MetadataError> {
        self.files
            .get_or_init(|| self.derive_files())
            .as_deref()
            .map_err(Clone::clone)
    }

    /// Decide whether this record and `other` name the same release.
    ///
    /// Exact string comparison of the identity triple in fixed order,
    /// timestamp first, then name, then version, returning false at the
    /// first mismatch. Fields are only required once the chain actually
    /// reaches them.
    ///
    /// # Errors
    ///
    /// [`MetadataError::MissingField`] when a field the comparison needs
    /// is absent from either record.
    pub fn same_as(&self, other: &Metadata) -> Result<bool, MetadataError> {
        let ours = require(self.timestamp.as_deref(), PACKAGE_TIMESTAMP)?;
        let theirs = require(other.timestamp.as_deref(), PACKAGE_TIMESTAMP)?;
        if ours != theirs {
            tracing::debug!("creation timestamps differ: `{ours}` vs `{theirs}`");
            return Ok(false);
        }

        let ours = require(self.name.as_deref(), PACKAGE_NAME)?;
        let theirs = require(other.name.as_deref(), PACKAGE_NAME)?;
        if ours != theirs {
            tracing::debug!("package names differ: `{ours}` vs `{theirs}`");
            return Ok(false);
        }

        let ours = require(self.version.as_deref(), PACKAGE_VERSION)?;
        let theirs = require(other.version.as_deref(), PACKAGE_VERSION)?;
        if ours != theirs {
            tracing::debug!("package versions differ: `{ours}` vs `{theirs}`");
            return Ok(false);
        }

        Ok(true)
    }

    /// Set one property by wire key, routing recognized keys to their
    /// typed fields and everything else to the extra map. Last write wins.
    ///
    /// Intended for the single-threaded construction phase only; a file
    /// list that was already materialized is not re-derived.
    ///
    /// # Errors
    ///
    /// [`MetadataError::InvalidField`] when the version key is given a
    /// value that is not a non-negative integer.
    pub fn add_property(&mut self, key: &str, value: &str) -> Result<(), MetadataError> {
        match key {
            PACKAGE_METADATA_VERSION => self.metadata_version = Some(parse_version(value)?),
            PACKAGE_NAME => self.name = Some(value.to_string()),
            PACKAGE_VERSION => self.version = Some(value.to_string()),
            PACKAGE_TIMESTAMP => self.timestamp = Some(value.to_string()),
            PACKAGE_TYPE => self.package_type = Some(PackageType::from_wire(value)),
            APP_MAINCLASS => self.app.main_class = Some(value.to_string()),
            APP_MAINJAR => self.app.main_jar = Some(value.to_string()),
            APP_MAXHEAP => self.app.max_heap = Some(value.to_string()),
            APP_MINHEAP => self.app.min_heap = Some(value.to_string()),
            APP_DEPENDENCIES => self.app.dependencies = Some(value.to_string()),
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn from_props(mut map: BTreeMap<String, String>) -> Result<Self, MetadataError> {
        let metadata_version = match map.remove(PACKAGE_METADATA_VERSION) {
            Some(raw) => Some(parse_version(&raw)?),
            None => None,
        };
        let package_type = map
            .remove(PACKAGE_TYPE)
            .map(|raw| PackageType::from_wire(&raw));
        let app = AppSettings {
            main_class: map.remove(APP_MAINCLASS),
            main_jar: map.remove(APP_MAINJAR),
            max_heap: map.remove(APP_MAXHEAP),
            min_heap: map.remove(APP_MINHEAP),
            dependencies: map.remove(APP_DEPENDENCIES),
        };

        Ok(Self {
            metadata_version,
            name: map.remove(PACKAGE_NAME),
            version: map.remove(PACKAGE_VERSION),
            timestamp: map.remove(PACKAGE_TIMESTAMP),
            package_type,
            app,
            extra: map,
            files: OnceLock::new(),
        })
    }

    fn to_props(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();

        map.insert(
            PACKAGE_METADATA_VERSION.to_string(),
            self.metadata_version
                .unwrap_or(METADATA_VERSION_LATEST)
                .to_string(),
        );
        if let Some(name) = &self.name {
            map.insert(PACKAGE_NAME.to_string(), name.clone());
        }
        if let Some(version) = &self.version {
            map.insert(PACKAGE_VERSION.to_string(), version.clone());
        }
        if let Some(timestamp) = &self.timestamp {
            map.insert(PACKAGE_TIMESTAMP.to_string(), timestamp.clone());
        }
        if let Some(kind) = &self.package_type {
            map.insert(PACKAGE_TYPE.to_string(), kind.as_wire().to_string());
        }
        if let Some(main_class) = &self.app.main_class {
            map.insert(APP_MAINCLASS.to_string(), main_class.clone());
        }
        if let Some(main_jar) = &self.app.main_jar {
            map.insert(APP_MAINJAR.to_string(), main_jar.clone());
        }
        if let Some(max_heap) = &self.app.max_heap {
            map.insert(APP_MAXHEAP.to_string(), max_heap.clone());
        }
        if let Some(min_heap) = &self.app.min_heap {
            map.insert(APP_MINHEAP.to_string(), min_heap.clone());
        }
        if let Some(dependencies) = &self.app.dependencies {
            map.insert(APP_DEPENDENCIES.to_string(), dependencies.clone());
        }

        // A decoded record keeps its positional keys in the extra map, so
        // they are already present; only a construction-supplied list needs
        // to be written out here.
        if !map.contains_key(FILE_COUNT) {
            if let Some(Ok(files)) = self.files.get() {
                map.insert(FILE_COUNT.to_string(), files.len().to_string());
                for (idx, file) in files.iter().enumerate() {
                    map.insert(format!("{FILE_PATH}.{idx}"), file.path.clone());
                    map.insert(format!("{FILE_CRC}.{idx}"), file.crc.to_string());
                }
            }
        }

        map
    }

    fn derive_files(&self) -> Result<Vec<PackageFile>, MetadataError> {
        let declared = match self.extra.get(FILE_COUNT) {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| MetadataError::InvalidField {
                    key: FILE_COUNT.to_string(),
                    value: raw.clone(),
                })?,
            None => 0,
        };

        let mut files = Vec::new();
        for idx in 0..declared {
            let path = self.extra.get(&format!("{FILE_PATH}.{idx}"));
            let crc = self.extra.get(&format!("{FILE_CRC}.{idx}"));
            let (Some(path), Some(crc)) = (path, crc) else {
                return Err(MetadataError::InconsistentFileList {
                    declared,
                    found: idx,
                });
            };
            let crc = crc.parse::<u64>().map_err(|_| MetadataError::InvalidField {
                key: format!("{FILE_CRC}.{idx}"),
                value: crc.clone(),
            })?;
            files.push(PackageFile::new(path.clone(), crc));
        }

        // Stray pairs past the declared count mean the count key lies in
        // the other direction; report instead of silently truncating.
        let mut found = declared;
        while self.positional_pair_present(found) {
            found += 1;
        }
        if found != declared {
            return Err(MetadataError::InconsistentFileList { declared, found });
        }

        Ok(files)
    }

    fn positional_pair_present(&self, idx: usize) -> bool {
        self.extra.contains_key(&format!("{FILE_PATH}.{idx}"))
            || self.extra.contains_key(&format!("{FILE_CRC}.{idx}"))
    }
}

impl fmt::Display for Metadata {
    /// Sorted key-value dump, one `  >> key = value` line per property.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.to_props() {
            writeln!(f, "  >> {key} = {value}")?;
        }
        Ok(())
    }
}

fn require<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, MetadataError> {
    value.ok_or(MetadataError::MissingField(key))
}

fn parse_version(raw: &str) -> Result<u32, MetadataError> {
    raw.parse().map_err(|_| MetadataError::InvalidField {
        key: PACKAGE_METADATA_VERSION.to_string(),
        value: raw.to_string(),
    })
}

/// Builder for fresh [`Metadata`] records at package-build time.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    metadata_version: Option<u32>,
    name: Option<String>,
    version: Option<String>,
    timestamp: Option<String>,
    package_type: Option<PackageType>,
    app: AppSettings,
    files: Option<Vec<PackageFile>>,
}

impl MetadataBuilder {
    /// Set an explicit format generation. Leaving it unset stamps the
    /// latest generation at encode time.
    pub fn metadata_version(mut self, version: u32) -> Self {
        self.metadata_version = Some(version);
        self
    }

    /// Set the package name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the package version string.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the build timestamp.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Set the package type.
    pub fn package_type(mut self, kind: PackageType) -> Self {
        self.package_type = Some(kind);
        self
    }

    /// Set the app entry-point class.
    pub fn main_class(mut self, main_class: impl Into<String>) -> Self {
        self.app.main_class = Some(main_class.into());
        self
    }

    /// Set the app main archive name.
    pub fn main_jar(mut self, main_jar: impl Into<String>) -> Self {
        self.app.main_jar = Some(main_jar.into());
        self
    }

    /// Set the app maximum heap size.
    pub fn max_heap(mut self, max_heap: impl Into<String>) -> Self {
        self.app.max_heap = Some(max_heap.into());
        self
    }

    /// Set the app minimum heap size.
    pub fn min_heap(mut self, min_heap: impl Into<String>) -> Self {
        self.app.min_heap = Some(min_heap.into());
        self
    }

    /// Set the app dependency list.
    pub fn dependencies(mut self, dependencies: impl Into<String>) -> Self {
        self.app.dependencies = Some(dependencies.into());
        self
    }

    /// Supply the file list directly. The built record returns exactly
    /// this list from [`Metadata::files`] without re-derivation.
    pub fn files(mut self, files: Vec<PackageFile>) -> Self {
        self.files = Some(files);
        self
    }

    /// Finish the record.
    pub fn build(self) -> Metadata {
        let cell = OnceLock::new();
        if let Some(files) = self.files {
            let _ = cell.set(Ok(files));
        }

        Metadata {
            metadata_version: self.metadata_version,
            name: self.name,
            version: self.version,
            timestamp: self.timestamp,
            package_type: self.package_type,
            app: self.app,
            extra: BTreeMap::new(),
            files: cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata::builder()
            .name("payload-demo")
            .version("2.1.0")
            .timestamp("2024-03-01 10:15:00.000")
            .package_type(PackageType::App)
            .main_class("esa.demo.Main")
            .main_jar("demo-2.1.0.jar")
            .max_heap("96m")
            .files(vec![
                PackageFile::new("demo-2.1.0.jar", 123_456),
                PackageFile::new("lib/helper.jar", 789),
            ])
            .build()
    }

    #[test]
    fn round_trip_preserves_fields_and_file_order() {
        let original = sample();
        let decoded = Metadata::from_bytes(&original.to_bytes()).unwrap();

        assert_eq!(decoded.metadata_version(), Some(METADATA_VERSION_LATEST));
        assert_eq!(decoded.name(), Some("payload-demo"));
        assert_eq!(decoded.version(), Some("2.1.0"));
        assert_eq!(decoded.timestamp(), Some("2024-03-01 10:15:00.000"));
        assert_eq!(decoded.package_type(), Some(&PackageType::App));
        assert_eq!(decoded.app().main_class(), Some("esa.demo.Main"));
        assert_eq!(decoded.app().main_jar(), Some("demo-2.1.0.jar"));
        assert_eq!(decoded.app().max_heap(), Some("96m"));
        assert_eq!(decoded.app().min_heap(), None);
        assert_eq!(decoded.files().unwrap(), original.files().unwrap());
    }

    #[test]
    fn encoding_is_deterministic_regardless_of_insertion_order() {
        let mut forward = Metadata::builder().name("a").build();
        forward.add_property("custom.one", "1").unwrap();
        forward.add_property("custom.two", "2").unwrap();

        let mut reverse = Metadata::builder().name("a").build();
        reverse.add_property("custom.two", "2").unwrap();
        reverse.add_property("custom.one", "1").unwrap();

        assert_eq!(forward.to_bytes(), reverse.to_bytes());
        assert_eq!(forward.to_bytes(), forward.to_bytes());
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let text = "future.key=still here\ninfo.name=demo\n";
        let decoded = Metadata::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(decoded.extra()["future.key"], "still here");

        let reencoded = String::from_utf8(decoded.to_bytes()).unwrap();
        assert!(reencoded.contains("future.key=still here\n"));
    }

    #[test]
    fn encode_stamps_latest_version_only_when_unset() {
        let fresh = Metadata::builder().name("a").build();
        let decoded = Metadata::from_bytes(&fresh.to_bytes()).unwrap();
        assert_eq!(decoded.metadata_version(), Some(METADATA_VERSION_LATEST));

        let pinned = Metadata::builder().metadata_version(2).name("a").build();
        let decoded = Metadata::from_bytes(&pinned.to_bytes()).unwrap();
        assert_eq!(decoded.metadata_version(), Some(2));
    }

    #[test]
    fn decode_never_injects_a_version() {
        let decoded = Metadata::from_bytes(b"info.name=demo\n").unwrap();
        assert_eq!(decoded.metadata_version(), None);
    }

    #[test]
    fn decoded_version_survives_a_reencode() {
        let decoded = Metadata::from_bytes(b"info.metadata-version=3\ninfo.name=old\n").unwrap();
        let reencoded = Metadata::from_bytes(&decoded.to_bytes()).unwrap();
        assert_eq!(reencoded.metadata_version(), Some(3));
    }

    #[test]
    fn reencoding_a_decoded_record_is_byte_identical() {
        let canonical = sample().to_bytes();
        let decoded = Metadata::from_bytes(&canonical).unwrap();
        assert_eq!(decoded.to_bytes(), canonical);
    }

    #[test]
    fn garbage_version_is_rejected() {
        let err = Metadata::from_bytes(b"info.metadata-version=four\n").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidField { key, .. } if key == PACKAGE_METADATA_VERSION));

        let err = Metadata::from_bytes(b"info.metadata-version=-1\n").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidField { .. }));
    }

    #[test]
    fn pre_typing_records_are_always_apps() {
        let untyped = Metadata::builder().metadata_version(3).build();
        assert!(untyped.is_app_package());

        let absurd = Metadata::builder()
            .metadata_version(3)
            .package_type(PackageType::Dependency)
            .build();
        assert!(absurd.is_app_package());

        let versionless = Metadata::builder()
            .package_type(PackageType::Dependency)
            .build();
        assert!(versionless.is_app_package());
    }

    #[test]
    fn typed_records_gate_on_the_type_key() {
        let dependency = Metadata::builder()
            .metadata_version(4)
            .package_type(PackageType::Dependency)
            .build();
        assert!(!dependency.is_app_package());

        let app = Metadata::builder()
            .metadata_version(4)
            .package_type(PackageType::App)
            .build();
        assert!(app.is_app_package());

        let implied = Metadata::builder().metadata_version(4).build();
        assert!(implied.is_app_package());
    }

    #[test]
    fn same_as_compares_the_identity_triple() {
        let a = sample();
        let mut b = sample();
        b.add_property("custom.noise", "ignored").unwrap();
        assert_eq!(a.same_as(&b), Ok(true));

        let shifted = Metadata::builder()
            .name("payload-demo")
            .version("2.1.0")
            .timestamp("2024-03-02 09:00:00.000")
            .build();
        assert_eq!(a.same_as(&shifted), Ok(false));

        let renamed = Metadata::builder()
            .name("payload-demo-b")
            .version("2.1.0")
            .timestamp("2024-03-01 10:15:00.000")
            .build();
        assert_eq!(a.same_as(&renamed), Ok(false));

        let bumped = Metadata::builder()
            .name("payload-demo")
            .version("2.2.0")
            .timestamp("2024-03-01 10:15:00.000")
            .build();
        assert_eq!(a.same_as(&bumped), Ok(false));
    }

    #[test]
    fn same_as_requires_fields_only_when_reached() {
        let a = sample();
        let missing_timestamp = Metadata::builder().name("x").version("1").build();
        assert_eq!(
            a.same_as(&missing_timestamp),
            Err(MetadataError::MissingField(PACKAGE_TIMESTAMP))
        );

        // Timestamps differ, so the absent names are never consulted.
        let nameless = Metadata::builder().timestamp("different").build();
        assert_eq!(a.same_as(&nameless), Ok(false));

        // Timestamps match, so the chain reaches the absent name.
        let nameless_twin = Metadata::builder()
            .timestamp("2024-03-01 10:15:00.000")
            .build();
        assert_eq!(
            a.same_as(&nameless_twin),
            Err(MetadataError::MissingField(PACKAGE_NAME))
        );
    }

    #[test]
    fn files_derive_from_positional_keys() {
        let text = "zipped.file.count=2\n\
                    zipped.file.path.0=bin/app.jar\n\
                    zipped.file.crc.0=42\n\
                    zipped.file.path.1=etc/config.xml\n\
                    zipped.file.crc.1=7\n";
        let record = Metadata::from_bytes(text.as_bytes()).unwrap();
        let files = record.files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], PackageFile::new("bin/app.jar", 42));
        assert_eq!(files[1], PackageFile::new("etc/config.xml", 7));
    }

    #[test]
    fn absent_count_means_no_files() {
        let record = Metadata::from_bytes(b"info.name=empty\n").unwrap();
        assert!(record.files().unwrap().is_empty());
    }

    #[test]
    fn stray_pairs_without_count_are_inconsistent() {
        let text = "zipped.file.path.0=a\nzipped.file.crc.0=1\n";
        let record = Metadata::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(
            record.files(),
            Err(MetadataError::InconsistentFileList {
                declared: 0,
                found: 1
            })
        );
    }

    #[test]
    fn overdeclared_count_is_inconsistent() {
        let text = "zipped.file.count=5\n\
                    zipped.file.path.0=a\nzipped.file.crc.0=1\n\
                    zipped.file.path.1=b\nzipped.file.crc.1=2\n\
                    zipped.file.path.2=c\nzipped.file.crc.2=3\n";
        let record = Metadata::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(
            record.files(),
            Err(MetadataError::InconsistentFileList {
                declared: 5,
                found: 3
            })
        );
    }

    #[test]
    fn underdeclared_count_is_inconsistent() {
        let text = "zipped.file.count=2\n\
                    zipped.file.path.0=a\nzipped.file.crc.0=1\n\
                    zipped.file.path.1=b\nzipped.file.crc.1=2\n\
                    zipped.file.path.2=c\nzipped.file.crc.2=3\n";
        let record = Metadata::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(
            record.files(),
            Err(MetadataError::InconsistentFileList {
                declared: 2,
                found: 3
            })
        );
    }

    #[test]
    fn unparsable_count_and_crc_are_invalid_fields() {
        let record = Metadata::from_bytes(b"zipped.file.count=many\n").unwrap();
        assert!(matches!(
            record.files(),
            Err(MetadataError::InvalidField { key, .. }) if key == FILE_COUNT
        ));

        let text = "zipped.file.count=1\n\
                    zipped.file.path.0=a\n\
                    zipped.file.crc.0=0x2a\n";
        let record = Metadata::from_bytes(text.as_bytes()).unwrap();
        assert!(matches!(
            record.files(),
            Err(MetadataError::InvalidField { key, .. }) if key == "zipped.file.crc.0"
        ));
    }

    #[test]
    fn supplied_file_list_is_returned_without_rederivation() {
        let record = sample();
        let first = record.files().unwrap();
        let second = record.files().unwrap();
        assert_eq!(first.as_ptr(), second.as_ptr());
    }

    #[test]
    fn concurrent_first_access_materializes_once() {
        let text = "zipped.file.count=2\n\
                    zipped.file.path.0=a\nzipped.file.crc.0=1\n\
                    zipped.file.path.1=b\nzipped.file.crc.1=2\n";
        let record = Metadata::from_bytes(text.as_bytes()).unwrap();
        let record = &record;

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(move || record.files().unwrap().as_ptr() as usize))
                .collect();
            let first = record.files().unwrap().as_ptr() as usize;
            for handle in handles {
                assert_eq!(handle.join().unwrap(), first);
            }
        });
    }

    #[test]
    fn add_property_routes_typed_keys_and_wins_last() {
        let mut record = Metadata::builder().build();
        record.add_property(PACKAGE_NAME, "first").unwrap();
        record.add_property(PACKAGE_NAME, "second").unwrap();
        record.add_property(PACKAGE_TYPE, "mission").unwrap();
        record.add_property("x.custom", "1").unwrap();

        assert_eq!(record.name(), Some("second"));
        assert_eq!(record.package_type(), Some(&PackageType::MissionUpdate));
        assert_eq!(record.extra()["x.custom"], "1");

        let err = record
            .add_property(PACKAGE_METADATA_VERSION, "latest")
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidField { .. }));
    }

    #[test]
    fn display_dumps_sorted_properties() {
        let record = Metadata::builder()
            .name("demo")
            .version("1.0")
            .build();
        let dump = record.to_string();
        let name_line = dump.find(">> info.name = demo").unwrap();
        let version_line = dump.find(">> info.version = 1.0").unwrap();
        assert!(dump.lines().all(|line| line.starts_with("  >> ")));
        assert!(name_line < version_line);
    }

    #[test]
    fn store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/manifest.properties");
        sample().store(&path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, sample().to_bytes());
    }
}
