//! Info command

use std::path::Path;

use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;
use nmfpack_core::archive::{self, LocatedManifest};
use nmfpack_core::metadata::{FILE_COUNT, FILE_CRC, FILE_PATH, Metadata};
use nmfpack_schema::PackageType;
use serde_json::json;

/// Show the manifest of a package archive.
pub fn info(package: &Path, json: bool) -> Result<()> {
    let located = archive::locate_from_path(package)
        .with_context(|| format!("loading {}", package.display()))?;

    let (record, legacy) = match located {
        LocatedManifest::Current(record) => (record, false),
        LocatedManifest::Legacy(record) => (record, true),
        LocatedManifest::NotFound => bail!("{} carries no manifest entry", package.display()),
    };
    tracing::debug!("Read manifest from {}", package.display());

    if json {
        print_json(&record, legacy)
    } else {
        print_table(&record, legacy)
    }
}

/// Whether `key` belongs to the positional file list, which is rendered
/// as the file table rather than as an extra row.
fn is_file_list_key(key: &str) -> bool {
    key == FILE_COUNT || key.starts_with(FILE_PATH) || key.starts_with(FILE_CRC)
}

fn print_table(record: &Metadata, legacy: bool) -> Result<()> {
    let lw = 12;

    println!();
    println!(
        "  {} {}",
        record.name().unwrap_or("?").white().bold(),
        record.version().unwrap_or("?").dark_grey()
    );
    if legacy {
        println!("  {}", "adapted from a legacy receipt".yellow());
    }
    println!();

    if let Some(timestamp) = record.timestamp() {
        println!("  {:<lw$}{timestamp}", "created");
    }
    if let Some(generation) = record.metadata_version() {
        println!("  {:<lw$}{generation}", "generation");
    }
    match record.package_type() {
        Some(kind) => println!("  {:<lw$}{kind}", "type"),
        None => println!("  {:<lw$}{}", "type", "app (implied)"),
    }

    let app = record.app();
    if let Some(mainclass) = app.main_class() {
        println!("  {:<lw$}{mainclass}", "mainclass");
    }
    if let Some(mainjar) = app.main_jar() {
        println!("  {:<lw$}{mainjar}", "mainjar");
    }
    if let Some(maxheap) = app.max_heap() {
        println!("  {:<lw$}{maxheap}", "maxheap");
    }
    if let Some(minheap) = app.min_heap() {
        println!("  {:<lw$}{minheap}", "minheap");
    }
    if let Some(dependencies) = app.dependencies() {
        println!("  {:<lw$}{dependencies}", "requires");
    }

    for (key, value) in record.extra() {
        if !is_file_list_key(key) {
            println!("  {:<lw$}{value}", key.as_str());
        }
    }

    let files = record.files()?;
    if !files.is_empty() {
        println!();
        println!("  {:<lw$}{}", "files", files.len());
        for file in files {
            println!("  {:>12}  {}", file.crc, file.path);
        }
    }

    Ok(())
}

fn print_json(record: &Metadata, legacy: bool) -> Result<()> {
    let files: Vec<_> = record
        .files()?
        .iter()
        .map(|file| json!({ "path": file.path, "crc": file.crc }))
        .collect();

    let extra: serde_json::Map<String, serde_json::Value> = record
        .extra()
        .iter()
        .filter(|(key, _)| !is_file_list_key(key))
        .map(|(key, value)| (key.clone(), json!(value)))
        .collect();

    let report = json!({
        "name": record.name(),
        "version": record.version(),
        "creation_timestamp": record.timestamp(),
        "metadata_version": record.metadata_version(),
        "type": record.package_type().map(PackageType::as_wire),
        "is_app": record.is_app_package(),
        "legacy": legacy,
        "app": {
            "mainclass": record.app().main_class(),
            "mainjar": record.app().main_jar(),
            "maxheap": record.app().max_heap(),
            "minheap": record.app().min_heap(),
            "dependencies": record.app().dependencies(),
        },
        "files": files,
        "extra": extra,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
