//! Package assembly from a build recipe.
//!
//! This is the build-time half of the subsystem: it resolves a recipe's
//! payload mappings against the filesystem, checksums every payload file,
//! constructs the fresh manifest, and writes the package archive with the
//! manifest as its first entry.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use nmfpack_schema::{ARCHIVE_SEPARATOR, PackageFile, crc};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::metadata::{METADATA_FILENAME, Metadata};
use crate::recipe::Recipe;

/// File extension of produced package archives.
pub const PACKAGE_EXTENSION: &str = "nmfpack";

/// Timestamp format stamped into fresh manifests.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One payload file scheduled for the archive.
#[derive(Debug)]
struct PayloadEntry {
    source: PathBuf,
    archive_path: String,
}

/// Assemble a package archive from a recipe.
///
/// Source paths in the recipe resolve against `base_dir`. The archive is
/// written to `out_dir` (created if needed) as
/// `<name>-<version>.nmfpack`, manifest entry first, then every payload
/// entry in recipe order with directory contents walked in sorted order.
/// Returns the path of the written archive.
///
/// # Errors
///
/// Fails when a payload source is missing, unreadable, or the archive
/// cannot be written.
pub fn create_package(recipe: &Recipe, base_dir: &Path, out_dir: &Path) -> Result<PathBuf> {
    let entries = resolve_payload(recipe, base_dir)?;

    let mut files = Vec::with_capacity(entries.len());
    for entry in &entries {
        let checksum = crc::compute_file(&entry.source)
            .with_context(|| format!("checksumming {}", entry.source.display()))?;
        files.push(PackageFile::new(entry.archive_path.clone(), checksum));
    }

    let metadata = build_metadata(recipe, files)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let out_path = out_dir.join(format!(
        "{}-{}.{PACKAGE_EXTENSION}",
        recipe.package.name, recipe.package.version
    ));

    write_archive(&out_path, &metadata, &entries)?;
    tracing::debug!(
        "packaged {} payload entries into {}",
        entries.len(),
        out_path.display()
    );
    Ok(out_path)
}

/// Expand the recipe's mappings into concrete payload entries.
///
/// A file mapping contributes itself at its destination path. A directory
/// mapping contributes every file beneath it, walked in sorted order so
/// the archive layout does not depend on readdir order, at the
/// destination prefix plus the path relative to the mapped directory.
fn resolve_payload(recipe: &Recipe, base_dir: &Path) -> Result<Vec<PayloadEntry>> {
    let mut entries = Vec::new();

    for mapping in &recipe.files {
        let source = base_dir.join(&mapping.source);
        let dest = match &mapping.dest {
            Some(dest) => dest.clone(),
            None => join_archive_path("", &mapping.source),
        };

        if source.is_dir() {
            for file in walkdir::WalkDir::new(&source).sort_by_file_name() {
                let file = file.with_context(|| format!("walking {}", source.display()))?;
                if !file.file_type().is_file() {
                    continue;
                }
                let relative = file.path().strip_prefix(&source)?;
                entries.push(PayloadEntry {
                    source: file.path().to_path_buf(),
                    archive_path: join_archive_path(&dest, relative),
                });
            }
        } else if source.is_file() {
            entries.push(PayloadEntry {
                source,
                archive_path: dest,
            });
        } else {
            bail!("payload source `{}` does not exist", source.display());
        }
    }

    Ok(entries)
}

/// Join an archive prefix and a relative filesystem path with the
/// canonical separator, regardless of host separators.
fn join_archive_path(prefix: &str, relative: &Path) -> String {
    let mut out = prefix.trim_end_matches(ARCHIVE_SEPARATOR).to_string();
    for component in relative.components() {
        if !out.is_empty() {
            out.push(ARCHIVE_SEPARATOR);
        }
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}

fn build_metadata(recipe: &Recipe, files: Vec<PackageFile>) -> Result<Metadata> {
    let timestamp = recipe
        .package
        .timestamp
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string());

    let mut builder = Metadata::builder()
        .name(&recipe.package.name)
        .version(&recipe.package.version)
        .timestamp(timestamp)
        .files(files);

    if let Some(kind) = &recipe.package.kind {
        builder = builder.package_type(kind.clone());
    }
    if let Some(mainclass) = &recipe.app.mainclass {
        builder = builder.main_class(mainclass);
    }
    if let Some(mainjar) = &recipe.app.mainjar {
        builder = builder.main_jar(mainjar);
    }
    if let Some(maxheap) = &recipe.app.maxheap {
        builder = builder.max_heap(maxheap);
    }
    if let Some(minheap) = &recipe.app.minheap {
        builder = builder.min_heap(minheap);
    }
    if let Some(dependencies) = &recipe.app.dependencies {
        builder = builder.dependencies(dependencies);
    }

    let mut metadata = builder.build();
    for (key, value) in &recipe.properties {
        metadata
            .add_property(key, value)
            .with_context(|| format!("applying recipe property `{key}`"))?;
    }
    Ok(metadata)
}

/// Write the archive to a staging path beside the destination, then move
/// it into place, so a failed write never leaves a partial archive at
/// `out_path`.
fn write_archive(out_path: &Path, metadata: &Metadata, entries: &[PayloadEntry]) -> Result<()> {
    let staging = out_path.with_extension(format!("{PACKAGE_EXTENSION}.partial"));
    if let Err(err) = write_entries(&staging, metadata, entries) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }

    // Prefer rename (atomic on the same filesystem) with copy fallback.
    if fs::rename(&staging, out_path).is_err() {
        fs::copy(&staging, out_path)
            .with_context(|| format!("moving archive into {}", out_path.display()))?;
        fs::remove_file(&staging)?;
    }
    Ok(())
}

fn write_entries(staging: &Path, metadata: &Metadata, entries: &[PayloadEntry]) -> Result<()> {
    let file = File::create(staging)
        .with_context(|| format!("creating archive {}", staging.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    // Manifest first, so inspection tooling finds it at index zero.
    writer.start_file(METADATA_FILENAME, options)?;
    writer.write_all(&metadata.to_bytes())?;

    for entry in entries {
        writer.start_file(entry.archive_path.as_str(), options)?;
        let mut source = File::open(&entry.source)
            .with_context(|| format!("reading {}", entry.source.display()))?;
        io::copy(&mut source, &mut writer)?;
        tracing::debug!("added {}", entry.archive_path);
    }

    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use zip::ZipArchive;

    use super::*;
    use crate::archive;

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn demo_recipe() -> Recipe {
        Recipe::parse(
            r#"
[package]
name = "payload-demo"
version = "2.1.0"
type = "app"
timestamp = "2024-03-01 10:15:00.000"

[app]
mainclass = "esa.demo.Main"
mainjar = "demo.jar"

[[files]]
source = "build/demo.jar"
dest = "demo.jar"

[[files]]
source = "conf"
dest = "etc"

[properties]
"mission.codename" = "demo"
"#,
        )
        .unwrap()
    }

    #[test]
    fn creates_a_loadable_archive() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("build/demo.jar"), b"jar bytes");
        write_file(&dir.path().join("conf/app.properties"), b"a=1");
        write_file(&dir.path().join("conf/sub/extra.xml"), b"<x/>");

        let out = create_package(&demo_recipe(), dir.path(), &dir.path().join("out")).unwrap();
        assert_eq!(
            out.file_name().unwrap().to_str().unwrap(),
            "payload-demo-2.1.0.nmfpack"
        );

        let record = archive::load_from_path(&out).unwrap();
        assert_eq!(record.name(), Some("payload-demo"));
        assert_eq!(record.version(), Some("2.1.0"));
        assert_eq!(record.timestamp(), Some("2024-03-01 10:15:00.000"));
        assert_eq!(record.metadata_version(), Some(4));
        assert_eq!(record.app().main_class(), Some("esa.demo.Main"));
        assert_eq!(record.extra()["mission.codename"], "demo");

        let files = record.files().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            ["demo.jar", "etc/app.properties", "etc/sub/extra.xml"]
        );
        assert_eq!(files[0].crc, crc::compute(b"jar bytes"));
        assert_eq!(files[1].crc, crc::compute(b"a=1"));
    }

    #[test]
    fn manifest_is_the_first_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("build/demo.jar"), b"jar bytes");
        write_file(&dir.path().join("conf/app.properties"), b"a=1");

        let out = create_package(&demo_recipe(), dir.path(), &dir.path().join("out")).unwrap();

        let mut zip = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let first = zip.by_index(0).unwrap();
        assert_eq!(first.name(), METADATA_FILENAME);
    }

    #[test]
    fn payload_bytes_survive_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("build/demo.jar"), b"jar bytes");
        write_file(&dir.path().join("conf/app.properties"), b"a=1");

        let out = create_package(&demo_recipe(), dir.path(), &dir.path().join("out")).unwrap();

        let mut zip = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut entry = zip.by_name("etc/app.properties").unwrap();
        let mut bytes = Vec::new();
        io::Read::read_to_end(&mut entry, &mut bytes).unwrap();
        assert_eq!(bytes, b"a=1");
    }

    #[test]
    fn missing_payload_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_package(&demo_recipe(), dir.path(), &dir.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn failed_assembly_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        // A directory opens fine but fails on read, so the write dies
        // after the manifest entry has already been written.
        let unreadable = dir.path().join("payload");
        fs::create_dir_all(&unreadable).unwrap();

        let metadata = Metadata::builder().name("broken").version("0.1").build();
        let entries = vec![PayloadEntry {
            source: unreadable,
            archive_path: "payload.bin".into(),
        }];

        let out_path = out_dir.join("broken-0.1.nmfpack");
        assert!(write_archive(&out_path, &metadata, &entries).is_err());
        assert!(!out_path.exists());
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn successful_assembly_leaves_only_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("build/demo.jar"), b"jar bytes");
        write_file(&dir.path().join("conf/app.properties"), b"a=1");

        let out_dir = dir.path().join("out");
        create_package(&demo_recipe(), dir.path(), &out_dir).unwrap();

        let names: Vec<String> = fs::read_dir(&out_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["payload-demo-2.1.0.nmfpack"]);
    }

    #[test]
    fn omitted_dest_mirrors_the_source_path() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("lib/native/helper.so"), b"elf");

        let recipe = Recipe::parse(
            r#"
[package]
name = "bare"
version = "0.1"

[[files]]
source = "lib/native/helper.so"
"#,
        )
        .unwrap();

        let out = create_package(&recipe, dir.path(), &dir.path().join("out")).unwrap();
        let record = archive::load_from_path(&out).unwrap();
        assert_eq!(record.files().unwrap()[0].path, "lib/native/helper.so");
    }

    #[test]
    fn missing_timestamp_is_stamped_at_build_time() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = Recipe::parse(
            r#"
[package]
name = "bare"
version = "0.1"
"#,
        )
        .unwrap();

        let out = create_package(&recipe, dir.path(), &dir.path().join("out")).unwrap();
        let record = archive::load_from_path(&out).unwrap();
        let stamp = record.timestamp().unwrap();
        assert!(!stamp.is_empty());
        // The format carries millisecond precision: `2024-03-01 10:15:00.000`.
        assert_eq!(stamp.len(), 23);
    }
}
