//! # Zip I/O
//!
//! Lettura e scrittura sincrona degli archivi (eseguite in `spawn_blocking`).
//!
//! ## Responsabilità:
//! - Estrazione nella scratch root con rifiuto delle entry zip-slip
//! - Registrazione di ordine, timestamp e permessi di ogni entry
//! - Repack in un temp file accanto alla destinazione, poi rename atomico
//! - Copia raw (bytes compressi inclusi) delle entry firmate

use crate::archive::tree::{EntryCompression, EntryRecord, RepackPlan};
use crate::error::{OptimizeError, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Relative path for an entry name, rejecting anything that could escape the root
pub fn sanitize_entry_path(name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(OptimizeError::UnsafeEntry(name.to_string()));
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(OptimizeError::UnsafeEntry(name.to_string()));
    }
    Ok(relative)
}

/// Extract every entry of `source` under `root`, in archive order
pub fn extract(source: &Path, root: &Path) -> Result<Vec<EntryRecord>> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(source)?))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let relative = sanitize_entry_path(&name)?;
        let target = root.join(&relative);

        if file.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            std::io::copy(&mut file, &mut out)?;
        }

        entries.push(EntryRecord {
            index,
            name,
            relative,
            is_dir: file.is_dir(),
            last_modified: file.last_modified(),
            unix_mode: file.unix_mode(),
        });
    }

    Ok(entries)
}

fn options_for(entry: &EntryRecord, compression: EntryCompression) -> FileOptions {
    let mut options = FileOptions::default().last_modified_time(entry.last_modified);
    options = match compression {
        EntryCompression::Deflated => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9)),
        EntryCompression::Stored => options.compression_method(CompressionMethod::Stored),
    };
    if let Some(mode) = entry.unix_mode {
        options = options.unix_permissions(mode);
    }
    options
}

/// Write a fresh archive at `destination` following `plan`
pub fn write(plan: &RepackPlan, destination: &Path) -> Result<()> {
    let mut source = ZipArchive::new(BufReader::new(File::open(&plan.source)?))?;
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
    {
        let mut writer = ZipWriter::new(BufWriter::new(staged.as_file_mut()));

        for entry in &plan.entries {
            let options = options_for(entry, plan.compression);

            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }

            if plan.signed.contains(&entry.name) {
                let raw = source.by_index_raw(entry.index)?;
                writer.raw_copy_file(raw)?;
                continue;
            }

            let content = resolve_content(entry, &plan.root, &plan.replacements);
            writer.start_file(entry.name.as_str(), options)?;
            let mut input = File::open(&content)?;
            std::io::copy(&mut input, &mut writer)?;
        }

        let mut buffered = writer.finish()?;
        std::io::Write::flush(&mut buffered)?;
    }

    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

fn resolve_content(entry: &EntryRecord, root: &Path, replacements: &BTreeMap<String, PathBuf>) -> PathBuf {
    replacements
        .get(&entry.name)
        .cloned()
        .unwrap_or_else(|| root.join(&entry.relative))
}
