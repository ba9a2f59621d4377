//! # Processor Registry
//!
//! Catene ordinate di processor per tipo di file.
//!
//! ## Responsabilità:
//! - Mappa `FileKind` -> catena ordinata di `Arc<dyn Processor>`
//! - Rimozione per nome (lista `disabled` e processor solo-prima-passata)
//! - Costruzione delle catene standard a partire da `Config` e `ToolPaths`
//!
//! ## Catene standard:
//! - **png**: reencode*, oxipng, oxipng-alpha, zopflipng (race), pngout (race), ect, pngfix
//! - **nbt**: zopfli sul payload decompresso
//! - **ogg**: optivorbis con restore-on-empty
//!
//! (*) solo alla prima passata
//!
//! Il registry è un valore clonabile: ogni run lavora sulla propria copia, quindi
//! la rimozione dei processor solo-prima-passata non tocca le run successive.

use crate::args;
use crate::config::Config;
use crate::file_manager::FileKind;
use crate::processor::{
    CommandProcessor, OutputMode, Processor, ProcessorSpec, RacingProcessor, Reencoder,
    RestoreOnEmpty,
};
use crate::tool_resolver::ToolPaths;
use crate::utils::split_template;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const ZOPFLIPNG_FILTERS: [char; 9] = ['0', '1', '2', '3', '4', 'm', 'e', 'p', 'b'];
const PNGOUT_BLOCK_SIZES: [u32; 9] = [0, 128, 192, 256, 512, 1024, 2048, 4096, 8192];

/// Ordered processor chains per file kind
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    chains: BTreeMap<FileKind, Vec<Arc<dyn Processor>>>,
    first_pass_only: BTreeSet<String>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a processor to the chain of its kind
    pub fn register(mut self, processor: Arc<dyn Processor>) -> Self {
        self.chains.entry(processor.kind()).or_default().push(processor);
        self
    }

    pub fn mark_first_pass_only(mut self, name: &str) -> Self {
        self.first_pass_only.insert(name.to_string());
        self
    }

    /// Remove every processor called `name`, returning how many were removed
    pub fn remove(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for chain in self.chains.values_mut() {
            let before = chain.len();
            chain.retain(|p| p.name() != name);
            removed += before - chain.len();
        }
        removed
    }

    pub fn remove_first_pass_only(&mut self) {
        let names: Vec<String> = self.first_pass_only.iter().cloned().collect();
        for name in names {
            let removed = self.remove(&name);
            if removed > 0 {
                debug!("Removed first-pass-only processor {}", name);
            }
        }
    }

    pub fn chain_for(&self, kind: FileKind) -> &[Arc<dyn Processor>] {
        self.chains.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kinds that have at least one processor
    pub fn kinds(&self) -> Vec<FileKind> {
        self.chains
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn names(&self, kind: FileKind) -> Vec<&str> {
        self.chain_for(kind).iter().map(|p| p.name()).collect()
    }

    /// Standard chains for the enabled kinds, minus disabled processors
    pub fn standard(config: &Config, tools: &ToolPaths) -> Self {
        let root = config.scratch_root();
        let timeout = config.tool_timeout();
        let kinds = config.enabled_kinds();
        let bin = |tool: &str| tools.get(tool).map(Path::to_path_buf);
        let mut registry = Self::new();

        if kinds.contains(&FileKind::Png) {
            if config.reencode {
                registry = registry
                    .register(Arc::new(Reencoder::new(&root)))
                    .mark_first_pass_only("reencode");
            }

            let oxipng = ProcessorSpec::new("oxipng", bin("oxipng"), FileKind::Png, split_template("-o max -q"))
                .output(OutputMode::Flag("--out=".to_string()));
            let oxipng_alpha = ProcessorSpec::new("oxipng", bin("oxipng"), FileKind::Png, split_template("-o max -q -a"))
                .output(OutputMode::Flag("--out=".to_string()));
            let zopflipng = ProcessorSpec::new(
                "zopflipng",
                bin("zopflipng"),
                FileKind::Png,
                split_template("--iterations=15 --keepchunks=acTL,fdAT,fcTL -y"),
            );
            let pngout = ProcessorSpec::new("pngout", bin("pngout"), FileKind::Png, split_template("-q -y -r -k1 -s0"));
            let ect = ProcessorSpec::new(
                "ect",
                bin("ect"),
                FileKind::Png,
                split_template("-9 --allfilters-b -strip -keep -quiet --mt-deflate"),
            )
            .output(OutputMode::InPlace);
            let pngfix = ProcessorSpec::new("pngfix", bin("pngfix"), FileKind::Png, split_template("-o --strip=all -q"))
                .output(OutputMode::Flag("--out=".to_string()));

            registry = registry
                .register(Arc::new(CommandProcessor::new("oxipng", oxipng, &root).with_timeout(timeout)))
                .register(Arc::new(CommandProcessor::new("oxipng-alpha", oxipng_alpha, &root).with_timeout(timeout)))
                .register(Arc::new(
                    RacingProcessor::new("zopflipng", zopflipng, &root)
                        .variants(ZOPFLIPNG_FILTERS.iter().map(|f| args![format!("--filters={}", f)]))
                        .with_timeout(timeout),
                ))
                .register(Arc::new(
                    RacingProcessor::new("pngout", pngout, &root)
                        .variants(PNGOUT_BLOCK_SIZES.iter().map(|b| args![format!("-b{}", b)]))
                        .with_timeout(timeout),
                ))
                .register(Arc::new(CommandProcessor::new("ect", ect, &root).with_timeout(timeout)))
                .register(Arc::new(CommandProcessor::new("pngfix", pngfix, &root).with_timeout(timeout)));
        }

        if kinds.contains(&FileKind::Nbt) {
            let zopfli = ProcessorSpec::new("zopfli", bin("zopfli"), FileKind::Nbt, split_template("--gzip --i1000 -c"))
                .output(OutputMode::Stdout);
            registry = registry.register(Arc::new(
                CommandProcessor::new("zopfli", zopfli, &root)
                    .decompress_gzip()
                    .with_timeout(timeout),
            ));
        }

        if kinds.contains(&FileKind::Ogg) {
            let optivorbis = ProcessorSpec::new("optivorbis", bin("optivorbis"), FileKind::Ogg, split_template("-q -r ogg2ogg"));
            let inner: Arc<dyn Processor> =
                Arc::new(CommandProcessor::new("optivorbis", optivorbis, &root).with_timeout(timeout));
            registry = registry.register(Arc::new(RestoreOnEmpty::new(inner, &root)));
        }

        for name in &config.disabled {
            if registry.remove(name) > 0 {
                debug!("Disabled processor {}", name);
            }
        }

        registry
    }
}
