//! Unpacked archive state: scratch tree, entry order, signed entries and
//! nested-archive replacements.

use crate::file_manager::FileKind;
use crate::progress::RunStatistics;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Compression used when writing entries back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCompression {
    /// Deflate at maximum level (outer archives)
    Deflated,
    /// No compression (nested archives)
    Stored,
}

/// One entry as found in the source archive
#[derive(Debug, Clone)]
pub struct EntryRecord {
    /// Position in the source archive
    pub index: usize,
    /// Name exactly as stored in the archive
    pub name: String,
    /// Sanitized path relative to the scratch root
    pub relative: PathBuf,
    pub is_dir: bool,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
}

/// Owned snapshot of what repack needs, so the write can run off the async runtime
#[derive(Debug, Clone)]
pub struct RepackPlan {
    pub source: PathBuf,
    pub root: PathBuf,
    pub entries: Vec<EntryRecord>,
    pub signed: BTreeSet<String>,
    pub replacements: BTreeMap<String, PathBuf>,
    pub compression: EntryCompression,
}

/// An unpacked archive. The scratch directory is removed when the tree is dropped.
#[derive(Debug)]
pub struct ArchiveTree {
    pub(crate) source: PathBuf,
    pub(crate) scratch: TempDir,
    pub(crate) entries: Vec<EntryRecord>,
    pub(crate) signed: BTreeSet<String>,
    pub(crate) replacements: BTreeMap<String, PathBuf>,
    pub(crate) statistics: RunStatistics,
}

impl ArchiveTree {
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory holding the extracted entries
    pub fn root(&self) -> PathBuf {
        self.scratch.path().join("root")
    }

    /// Directory holding repacked nested archives
    pub fn nested_out(&self) -> PathBuf {
        self.scratch.path().join("nested-out")
    }

    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    pub fn is_signed(&self, name: &str) -> bool {
        self.signed.contains(name)
    }

    pub fn signed_entries(&self) -> &BTreeSet<String> {
        &self.signed
    }

    pub fn replacement(&self, name: &str) -> Option<&Path> {
        self.replacements.get(name).map(PathBuf::as_path)
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    /// Extracted files of the given kinds, excluding signed entries
    pub fn eligible_files(&self, kinds: &[FileKind]) -> Vec<PathBuf> {
        let root = self.root();
        self.untouched_files()
            .filter(|entry| {
                matches!(FileKind::from_path(&entry.relative), Some(kind) if kind != FileKind::Archive && kinds.contains(&kind))
            })
            .map(|entry| root.join(&entry.relative))
            .collect()
    }

    /// Nested jar/zip entries that are not signed
    pub fn nested_archives(&self) -> Vec<EntryRecord> {
        self.untouched_files()
            .filter(|entry| FileKind::from_path(&entry.relative) == Some(FileKind::Archive))
            .cloned()
            .collect()
    }

    fn untouched_files(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir && !self.signed.contains(&entry.name))
    }

    pub(crate) fn plan(&self, compression: EntryCompression) -> RepackPlan {
        RepackPlan {
            source: self.source.clone(),
            root: self.root(),
            entries: self.entries.clone(),
            signed: self.signed.clone(),
            replacements: self.replacements.clone(),
            compression,
        }
    }
}
