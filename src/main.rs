//! # Asset Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione e validazione della configurazione (file JSON + flag)
//! - Localizzazione dei tool e avvio di pipeline o archive optimizer
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG, `RUST_LOG` ha la precedenza)
//! 3. Carica `--config` se presente e applica i flag sopra
//! 4. Localizza i tool una sola volta e costruisce le catene di processor
//! 5. Directory: pipeline sui file trovati, poi ogni archivio in place
//! 6. Archivio: unpack/optimize/repack verso `--output` o in place
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-optimizer ./resources --passes 5 --workers 8 --disable pngout
//! asset-optimizer build/libs/mod.jar --output build/libs/mod-min.jar
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use asset_optimizer::{
    ArchiveOptimizer, BinaryLocator, Config, FileKind, FileManager, Pipeline, ProcessorRegistry,
    RunStatistics, ToolPathResolver, KNOWN_TOOLS,
};

#[derive(Parser)]
#[command(name = "asset-optimizer")]
#[command(about = "Losslessly shrink PNG, NBT and OGG assets, including inside jar/zip archives")]
struct Args {
    /// File, directory or archive to optimize
    input: Option<PathBuf>,

    /// Maximum number of passes
    #[arg(short, long)]
    passes: Option<usize>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Skip PNG files
    #[arg(long)]
    no_png: bool,

    /// Skip NBT files
    #[arg(long)]
    no_nbt: bool,

    /// Skip OGG files
    #[arg(long)]
    no_ogg: bool,

    /// Do not descend into jar/zip archives
    #[arg(long)]
    no_archives: bool,

    /// Skip the in-process PNG re-encode
    #[arg(long)]
    no_reencode: bool,

    /// Run every pass even when a pass saves nothing
    #[arg(short, long)]
    force: bool,

    /// No per-file report and no progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Process one file at a time
    #[arg(long)]
    slow: bool,

    /// Disable a processor or file kind by name (repeatable)
    #[arg(long = "disable", value_name = "NAME")]
    disabled: Vec<String>,

    /// Output path for archive input (default: replace in place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for scratch files (default: system temp dir)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Kill a tool invocation after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// JSON configuration file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print which external tools were found and exit
    #[arg(long)]
    list_tools: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(passes) = self.passes {
            config.passes = passes;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.png &= !self.no_png;
        config.nbt &= !self.no_nbt;
        config.ogg &= !self.no_ogg;
        config.archives &= !self.no_archives;
        config.reencode &= !self.no_reencode;
        config.force |= self.force;
        config.quiet |= self.quiet;
        config.slow |= self.slow;
        config.disabled.extend(self.disabled.iter().cloned());
        if self.work_dir.is_some() {
            config.work_dir = self.work_dir.clone();
        }
        if self.timeout.is_some() {
            config.tool_timeout_secs = self.timeout;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let resolver = ToolPathResolver::new();
    let tools = resolver.locate(KNOWN_TOOLS);

    if args.list_tools {
        println!("{}", resolver.tools_report(&tools));
        return Ok(());
    }

    let Some(input) = args.input.clone() else {
        return Err(anyhow::anyhow!("No input given (pass a file, directory or archive)"));
    };
    if !input.exists() {
        return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
    }

    let base = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    let config = args.apply(base);
    config.validate()?;

    for tool in KNOWN_TOOLS {
        if !tools.is_available(tool) {
            warn!("{} not found, processors using it will be skipped", tool);
        }
    }

    let registry = ProcessorRegistry::standard(&config, &tools);

    if input.is_dir() {
        optimize_directory(&input, config, registry).await?;
    } else if FileKind::from_path(&input) == Some(FileKind::Archive) {
        let destination = args.output.clone().unwrap_or_else(|| input.clone());
        let stats = ArchiveOptimizer::new(config.clone(), registry)
            .optimize_archive(&input, &destination)
            .await?;
        print_summary(&config, &stats);
    } else {
        let stats = Pipeline::new(config.clone(), registry).run(&[input]).await?;
        print_summary(&config, &stats);
    }

    Ok(())
}

async fn optimize_directory(root: &Path, config: Config, registry: ProcessorRegistry) -> Result<()> {
    let kinds: Vec<FileKind> = config
        .enabled_kinds()
        .into_iter()
        .filter(|kind| *kind != FileKind::Archive)
        .collect();
    let files = FileManager::find_files(root, &kinds);
    info!(
        "Found {} to optimize in {}",
        FileManager::plural(files.len() as u64, "file"),
        root.display()
    );

    let mut stats = Pipeline::new(config.clone(), registry.clone()).run(&files).await?;

    if config.enabled_kinds().contains(&FileKind::Archive) {
        let archives = FileManager::find_files(root, &[FileKind::Archive]);
        let optimizer = ArchiveOptimizer::new(config.clone(), registry);
        for archive in archives {
            match optimizer.optimize_archive(&archive, &archive).await {
                Ok(archive_stats) => stats.merge(&archive_stats),
                Err(e) => warn!("Failed to optimize archive {}: {:#}", archive.display(), e),
            }
        }
    }

    print_summary(&config, &stats);
    Ok(())
}

fn print_summary(config: &Config, stats: &RunStatistics) {
    if config.quiet {
        return;
    }
    info!("=== Optimization Complete ===");
    for line in stats.format_summary().lines() {
        info!("{}", line);
    }
}
