//! # Asset Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `file_manager`: Operazioni sui file, discovery e commit atomico
//! - `tool_resolver`: Localizzazione dei compressori esterni
//! - `processor`: Processor, racing e catene per tipo di file
//! - `optimizer`: Pipeline multi-passata e worker pool
//! - `archive`: Unpack/optimize/repack di jar e zip annidati
//! - `progress`: Progress bar e statistiche della run
//!
//! ## Utilizzo:
//! ```ignore
//! use asset_optimizer::{BinaryLocator, Config, Pipeline, ProcessorRegistry, ToolPathResolver, KNOWN_TOOLS};
//!
//! let config = Config::default();
//! let tools = ToolPathResolver::new().locate(KNOWN_TOOLS);
//! let registry = ProcessorRegistry::standard(&config, &tools);
//! let stats = Pipeline::new(config, registry).run(&files).await?;
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod optimizer;
pub mod processor;
pub mod progress;
pub mod tool_resolver;
pub mod utils;

#[cfg(test)]
mod testing;

pub use archive::{ArchiveOptimizer, ArchiveTree};
pub use config::Config;
pub use error::OptimizeError;
pub use file_manager::{FileKind, FileManager};
pub use optimizer::Pipeline;
pub use processor::{Processor, ProcessorRegistry};
pub use progress::RunStatistics;
pub use tool_resolver::{BinaryLocator, ToolPathResolver, ToolPaths, KNOWN_TOOLS};
