//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (temp file, copia input, commit)
//! - `Zip`: Archivio illeggibile o errore di scrittura durante il repack
//! - `Image`: Decodifica/encoding PNG fallita durante il re-encode
//! - `UnsafeEntry`: Entry di archivio che uscirebbe dalla scratch root (zip slip)
//! - `ToolLaunch`: Tool esterno che non parte nemmeno
//! - `ToolTimeout`: Tool esterno oltre il timeout configurato
//! - `Decompress`: Payload gzip (NBT) non decomprimibile
//! - `Validation`: Configurazione non valida
//!
//! ## Nota:
//! Un tool che produce un risultato più grande (o nessun output) NON è un errore:
//! il processor lascia il file invariato e ritorna `Ok(())`.

use std::path::PathBuf;

/// Custom error types for asset optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsafe archive entry (escapes scratch root): {0}")]
    UnsafeEntry(String),

    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("Failed to decompress {path}: {source}")]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, OptimizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = OptimizeError::ToolTimeout { tool: "pngout".to_string(), seconds: 30 };
        assert_eq!(err.to_string(), "pngout timed out after 30s");

        let err = OptimizeError::UnsafeEntry("../../evil".to_string());
        assert!(err.to_string().contains("../../evil"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: OptimizeError = io.into();
        assert!(matches!(err, OptimizeError::Io(_)));
    }
}
