//! # PNG Re-encoder
//!
//! Re-encode in-process delle immagini PNG con la crate `image`.
//!
//! ## Responsabilità:
//! - Salta contenuti che non sono PNG (magic number) e PNG animati (chunk `acTL`)
//! - Decodifica e ri-codifica con compressione massima e filtro adattivo
//! - Stesso contratto dei tool esterni: commit solo se il risultato è più piccolo
//!
//! Usato solo alla prima passata: i tool successivi lavorano sul risultato.

use crate::error::Result;
use crate::file_manager::{FileKind, FileManager};
use crate::processor::{applies_to, scratch_dir, Processor};
use async_trait::async_trait;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// In-process PNG re-encode
pub struct Reencoder {
    scratch_root: PathBuf,
}

impl Reencoder {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
        }
    }

    pub fn is_png(bytes: &[u8]) -> bool {
        bytes.starts_with(PNG_SIGNATURE)
    }

    /// True when an `acTL` chunk appears before the image data
    pub fn is_animated(bytes: &[u8]) -> bool {
        let mut offset = PNG_SIGNATURE.len();
        while offset + 8 <= bytes.len() {
            let length = u32::from_be_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]) as usize;
            let chunk_type = &bytes[offset + 4..offset + 8];
            match chunk_type {
                b"acTL" => return true,
                b"IDAT" | b"IEND" => return false,
                _ => {}
            }
            // length + type + data + crc
            offset = offset.saturating_add(12).saturating_add(length);
        }
        false
    }

    fn encode(bytes: &[u8]) -> Result<Vec<u8>> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        let mut encoded = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive);
        encoder.write_image(image.as_bytes(), image.width(), image.height(), image.color())?;
        Ok(encoded)
    }
}

#[async_trait]
impl Processor for Reencoder {
    fn name(&self) -> &str {
        "reencode"
    }

    fn kind(&self) -> FileKind {
        FileKind::Png
    }

    async fn process(&self, path: &Path) -> Result<()> {
        if !applies_to(FileKind::Png, path).await {
            return Ok(());
        }

        let bytes = tokio::fs::read(path).await?;
        if !Self::is_png(&bytes) || Self::is_animated(&bytes) {
            debug!("Not re-encoding {}", path.display());
            return Ok(());
        }

        let encoded = tokio::task::spawn_blocking(move || Self::encode(&bytes))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        let scratch = scratch_dir(&self.scratch_root, path)?;
        let candidate = scratch.path().join("reencoded.png");
        tokio::fs::write(&candidate, encoded).await?;
        FileManager::commit_if_smaller(path, &candidate).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn loose_png(path: &Path) {
        let img = RgbaImage::from_fn(128, 128, |x, _| Rgba([(x / 16) as u8 * 30, 40, 200, 255]));
        let mut buf = Vec::new();
        PngEncoder::new_with_quality(&mut buf, CompressionType::Huffman, FilterType::NoFilter)
            .write_image(img.as_raw(), 128, 128, image::ColorType::Rgba8)
            .unwrap();
        std::fs::write(path, buf).unwrap();
    }

    #[tokio::test]
    async fn test_reencode_shrinks_and_keeps_pixels() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("loose.png");
        loose_png(&file);
        let before = std::fs::metadata(&file).unwrap().len();
        let pixels_before = image::open(&file).unwrap().to_rgba8();

        Reencoder::new(dir.path()).process(&file).await.unwrap();

        assert!(std::fs::metadata(&file).unwrap().len() < before);
        assert_eq!(image::open(&file).unwrap().to_rgba8(), pixels_before);
    }

    #[tokio::test]
    async fn test_non_png_content_is_skipped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("fake.png");
        std::fs::write(&file, b"GIF89a pretending").unwrap();

        Reencoder::new(dir.path()).process(&file).await.unwrap();
        assert_eq!(std::fs::read(&file).unwrap(), b"GIF89a pretending");
    }

    #[test]
    fn test_animation_detection() {
        let mut apng = PNG_SIGNATURE.to_vec();
        apng.extend_from_slice(&13u32.to_be_bytes());
        apng.extend_from_slice(b"IHDR");
        apng.extend_from_slice(&[0u8; 13 + 4]);
        apng.extend_from_slice(&8u32.to_be_bytes());
        apng.extend_from_slice(b"acTL");
        apng.extend_from_slice(&[0u8; 8 + 4]);
        assert!(Reencoder::is_png(&apng));
        assert!(Reencoder::is_animated(&apng));

        let mut still = PNG_SIGNATURE.to_vec();
        still.extend_from_slice(&0u32.to_be_bytes());
        still.extend_from_slice(b"IEND");
        assert!(!Reencoder::is_animated(&still));
    }
}
