//! # Archive Optimizer
//!
//! Unpack, ottimizzazione e repack di archivi jar/zip, con ricorsione negli archivi annidati.
//!
//! ## Responsabilità:
//! - Unpack nella scratch directory con protezione zip-slip
//! - Lettura di `META-INF/MANIFEST.MF`: le entry con attributi `*Digest*` sono intoccabili
//! - Ottimizzazione dei file idonei tramite la `Pipeline`
//! - Ricorsione negli archivi annidati (repack senza compressione)
//! - Repack atomico: ordine originale, timestamp preservati, entry firmate copiate raw
//!
//! ## Flusso:
//! ```text
//! unpack(jar) -> ArchiveTree -> optimize(tree, passes) -> repack(tree, destination)
//! ```
//!
//! ## Gestione errori:
//! - Entry con path pericoloso o archivio illeggibile: errore fatale per quell'archivio
//! - Archivio annidato che fallisce: warning, l'entry originale viene mantenuta
//!
//! ## Esempio:
//! ```ignore
//! let optimizer = ArchiveOptimizer::new(config, registry);
//! let stats = optimizer.optimize_archive(&jar, &jar).await?;
//! ```

pub mod manifest;
pub mod tree;
pub mod zip_io;

pub use manifest::parse_signed_entries;
pub use tree::{ArchiveTree, EntryCompression, EntryRecord};
pub use zip_io::sanitize_entry_path;

use crate::config::Config;
use crate::error::{OptimizeError, Result};
use crate::file_manager::{FileKind, FileManager};
use crate::optimizer::Pipeline;
use crate::processor::ProcessorRegistry;
use crate::progress::RunStatistics;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Optimizes packed archives in place or into a new destination
pub struct ArchiveOptimizer {
    config: Config,
    registry: ProcessorRegistry,
}

impl ArchiveOptimizer {
    pub fn new(config: Config, registry: ProcessorRegistry) -> Self {
        Self { config, registry }
    }

    /// Extract `archive` into a fresh scratch directory
    pub async fn unpack(&self, archive: &Path) -> Result<ArchiveTree> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-archive-", FileManager::scratch_key(archive)))
            .tempdir_in(self.config.scratch_root())?;
        let root = scratch.path().join("root");
        std::fs::create_dir_all(&root)?;

        let source = archive.to_path_buf();
        let extract_root = root.clone();
        let entries = tokio::task::spawn_blocking(move || zip_io::extract(&source, &extract_root))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        let signed = match tokio::fs::read_to_string(root.join(manifest::MANIFEST_PATH)).await {
            Ok(text) => parse_signed_entries(&text),
            Err(_) => BTreeSet::new(),
        };
        for name in &signed {
            debug!("Ignoring {} as it is signed", name);
        }

        debug!(
            "Unpacked {} ({} entries) into {}",
            archive.display(),
            entries.len(),
            scratch.path().display()
        );

        Ok(ArchiveTree {
            source: archive.to_path_buf(),
            scratch,
            entries,
            signed,
            replacements: BTreeMap::new(),
            statistics: RunStatistics::new(),
        })
    }

    /// Optimize the tree's eligible files, then recurse into nested archives
    pub async fn optimize(&self, mut tree: ArchiveTree, passes: usize) -> anyhow::Result<ArchiveTree> {
        let kinds = self.config.enabled_kinds();
        let files = tree.eligible_files(&kinds);

        if !files.is_empty() {
            let config = Config {
                passes,
                ..self.config.clone()
            };
            let stats = Pipeline::new(config, self.registry.clone()).run(&files).await?;
            tree.statistics.merge(&stats);
        }

        if !kinds.contains(&FileKind::Archive) {
            return Ok(tree);
        }

        let nested_out = tree.nested_out();
        for entry in tree.nested_archives() {
            let source = tree.root().join(&entry.relative);
            let destination = nested_out.join(&entry.relative);

            match self.optimize_nested(source, destination.clone(), passes).await {
                Ok(stats) => {
                    tree.statistics.merge(&stats);
                    tree.replacements.insert(entry.name.clone(), destination);
                }
                Err(e) => warn!(
                    "Keeping nested archive {} in {} unchanged: {:#}",
                    entry.name,
                    tree.source.display(),
                    e
                ),
            }
        }

        Ok(tree)
    }

    fn optimize_nested(
        &self,
        source: PathBuf,
        destination: PathBuf,
        passes: usize,
    ) -> BoxFuture<'_, anyhow::Result<RunStatistics>> {
        async move {
            let tree = self.unpack(&source).await?;
            let tree = self.optimize(tree, passes).await?;
            self.repack(&tree, &destination, EntryCompression::Stored).await?;
            Ok(tree.statistics)
        }
        .boxed()
    }

    /// Write the tree back as an archive at `destination`
    pub async fn repack(
        &self,
        tree: &ArchiveTree,
        destination: &Path,
        compression: EntryCompression,
    ) -> Result<()> {
        let plan = tree.plan(compression);
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || zip_io::write(&plan, &destination))
            .await
            .map_err(|e| OptimizeError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    /// Unpack, optimize for the configured passes and repack to `destination`
    /// (which may be `source` itself)
    pub async fn optimize_archive(&self, source: &Path, destination: &Path) -> anyhow::Result<RunStatistics> {
        let start_time = Instant::now();
        let original_size = FileManager::file_size(source).await;

        let tree = self.unpack(source).await?;
        let tree = self.optimize(tree, self.config.passes).await?;
        self.repack(&tree, destination, EntryCompression::Deflated).await?;

        let new_size = FileManager::file_size(destination).await;
        let mut stats = tree.statistics.clone();
        stats.elapsed = start_time.elapsed();

        if !self.config.quiet {
            info!(
                "{}: {} -> {} ({:.2}%)",
                source.display(),
                FileManager::plural(original_size, "byte"),
                FileManager::plural(new_size, "byte"),
                FileManager::calculate_reduction(original_size, new_size)
            );
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ShrinkTo;
    use std::io::{Cursor, Read, Write};
    use std::sync::Arc;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stamp = DateTime::from_date_and_time(2020, 1, 2, 3, 4, 6).unwrap();
        for (name, data, method) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, FileOptions::default()).unwrap();
                continue;
            }
            let options = FileOptions::default()
                .compression_method(*method)
                .last_modified_time(stamp);
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
        let mut data = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut data).unwrap();
        data
    }

    fn optimizer(work: &Path) -> ArchiveOptimizer {
        let config = Config {
            passes: 2,
            workers: 2,
            quiet: true,
            work_dir: Some(work.to_path_buf()),
            ..Default::default()
        };
        let registry = ProcessorRegistry::new().register(Arc::new(ShrinkTo::new(FileKind::Png, 10)));
        ArchiveOptimizer::new(config, registry)
    }

    const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\n\r\nName: assets/signed.png\r\nSHA-256-Digest: abc=\r\n\r\n";

    #[tokio::test]
    async fn test_signed_entry_round_trips_byte_identical() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("mod.jar");
        let signed_bytes = vec![3u8; 400];
        std::fs::write(
            &jar,
            build_zip(&[
                ("META-INF/", b"", CompressionMethod::Stored),
                ("META-INF/MANIFEST.MF", MANIFEST, CompressionMethod::Deflated),
                ("assets/signed.png", &signed_bytes, CompressionMethod::Stored),
                ("assets/free.png", &[5u8; 400], CompressionMethod::Stored),
            ]),
        )
        .unwrap();

        let mut before = ZipArchive::new(Cursor::new(std::fs::read(&jar).unwrap())).unwrap();
        let signed_crc = before.by_name("assets/signed.png").unwrap().crc32();

        let out = dir.path().join("out.jar");
        optimizer(dir.path()).optimize_archive(&jar, &out).await.unwrap();

        let mut after = ZipArchive::new(Cursor::new(std::fs::read(&out).unwrap())).unwrap();
        let names: Vec<String> = after.file_names().map(str::to_string).collect();
        let mut ordered = Vec::new();
        for i in 0..after.len() {
            ordered.push(after.by_index(i).unwrap().name().to_string());
        }
        assert_eq!(
            ordered,
            vec!["META-INF/", "META-INF/MANIFEST.MF", "assets/signed.png", "assets/free.png"]
        );
        assert_eq!(names.len(), 4);

        {
            let signed = after.by_name("assets/signed.png").unwrap();
            assert_eq!(signed.compression(), CompressionMethod::Stored);
            assert_eq!(signed.crc32(), signed_crc);
            assert_eq!(signed.compressed_size(), 400);
        }
        assert_eq!(read_entry(&mut after, "assets/signed.png"), signed_bytes);
        assert_eq!(read_entry(&mut after, "assets/free.png"), vec![5u8; 10]);
        assert_eq!(read_entry(&mut after, "META-INF/MANIFEST.MF"), MANIFEST);

        let free = after.by_name("assets/free.png").unwrap();
        assert_eq!(free.compression(), CompressionMethod::Deflated);
        let stamp = free.last_modified();
        assert_eq!((stamp.year(), stamp.month(), stamp.day()), (2020, 1, 2));
        assert_eq!((stamp.hour(), stamp.minute(), stamp.second()), (3, 4, 6));
    }

    #[tokio::test]
    async fn test_nested_archive_is_optimized_and_stored() {
        let dir = TempDir::new().unwrap();
        let inner = build_zip(&[("textures/a.png", &[8u8; 1000], CompressionMethod::Stored)]);
        let class_bytes = b"\xCA\xFE\xBA\xBE some bytecode".to_vec();
        let jar = dir.path().join("outer.jar");
        std::fs::write(
            &jar,
            build_zip(&[
                ("Main.class", &class_bytes, CompressionMethod::Deflated),
                ("libs/inner.jar", &inner, CompressionMethod::Stored),
            ]),
        )
        .unwrap();

        let stats = optimizer(dir.path()).optimize_archive(&jar, &jar).await.unwrap();

        let mut outer = ZipArchive::new(Cursor::new(std::fs::read(&jar).unwrap())).unwrap();
        assert_eq!(read_entry(&mut outer, "Main.class"), class_bytes);

        let nested_bytes = read_entry(&mut outer, "libs/inner.jar");
        let mut nested = ZipArchive::new(Cursor::new(nested_bytes)).unwrap();
        assert_eq!(read_entry(&mut nested, "textures/a.png"), vec![8u8; 10]);
        assert_eq!(
            nested.by_name("textures/a.png").unwrap().compression(),
            CompressionMethod::Stored
        );

        assert_eq!(stats.bytes_before, 1000);
        assert_eq!(stats.bytes_after, 10);
    }

    #[tokio::test]
    async fn test_broken_nested_archive_is_kept() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("outer.jar");
        std::fs::write(
            &jar,
            build_zip(&[
                ("libs/broken.jar", b"this is not a zip", CompressionMethod::Stored),
                ("icon.png", &[1u8; 64], CompressionMethod::Stored),
            ]),
        )
        .unwrap();

        optimizer(dir.path()).optimize_archive(&jar, &jar).await.unwrap();

        let mut outer = ZipArchive::new(Cursor::new(std::fs::read(&jar).unwrap())).unwrap();
        assert_eq!(read_entry(&mut outer, "libs/broken.jar"), b"this is not a zip");
        assert_eq!(read_entry(&mut outer, "icon.png"), vec![1u8; 10]);
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("a").join("b");
        std::fs::create_dir_all(&work).unwrap();
        let jar = dir.path().join("evil.jar");
        std::fs::write(
            &jar,
            build_zip(&[
                ("ok.png", &[1u8; 20], CompressionMethod::Stored),
                ("../../evil", b"payload", CompressionMethod::Stored),
            ]),
        )
        .unwrap();

        let result = optimizer(&work).unpack(&jar).await;
        assert!(matches!(result, Err(OptimizeError::UnsafeEntry(_))));

        assert!(!dir.path().join("evil").exists());
        assert!(!dir.path().join("a").join("evil").exists());
        // the failed scratch tree was cleaned up
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_signed_nested_archive_is_not_recursed() {
        let dir = TempDir::new().unwrap();
        let inner = build_zip(&[("a.png", &[8u8; 100], CompressionMethod::Stored)]);
        let manifest = b"Manifest-Version: 1.0\n\nName: libs/inner.jar\nSHA1-Digest: q=\n";
        let jar = dir.path().join("outer.jar");
        std::fs::write(
            &jar,
            build_zip(&[
                ("META-INF/MANIFEST.MF", manifest, CompressionMethod::Deflated),
                ("libs/inner.jar", &inner, CompressionMethod::Stored),
            ]),
        )
        .unwrap();

        let optimizer = optimizer(dir.path());
        let tree = optimizer.unpack(&jar).await.unwrap();
        assert!(tree.is_signed("libs/inner.jar"));
        assert!(tree.nested_archives().is_empty());

        let tree = optimizer.optimize(tree, 1).await.unwrap();
        assert!(tree.replacement("libs/inner.jar").is_none());
    }

    #[tokio::test]
    async fn test_unreadable_archive_fails() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("garbage.jar");
        std::fs::write(&jar, b"PK but not really").unwrap();
        let result = optimizer(dir.path()).unpack(&jar).await;
        assert!(matches!(result, Err(OptimizeError::Zip(_))));
    }
}
