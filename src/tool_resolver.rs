//! # Tool Path Resolver
//!
//! Questo modulo trova i compressori esterni usati dai processor.
//!
//! ## Responsabilità:
//! - Risolve un nome logico di tool in un eseguibile (bundled o di sistema)
//! - Produce una `ToolPaths`: mappa valore, calcolata una volta sola al setup
//! - Genera un report di disponibilità dei tool (`--list-tools`)
//!
//! ## Ordine di ricerca:
//! 1. Directory indicata da `ASSET_OPTIMIZER_TOOLS`
//! 2. `~/.asset-optimizer/bin/<os>`
//! 3. `tools/` accanto all'eseguibile
//! 4. `PATH` di sistema
//!
//! In ogni directory bundled sono accettate sia `<dir>/<tool>` che
//! `<dir>/<tool>/<tool>`.
//!
//! Un tool non trovato non è un errore: il processor corrispondente viene saltato.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every external tool the standard processor chains can use
pub const KNOWN_TOOLS: &[&str] = &[
    "oxipng",
    "zopflipng",
    "pngout",
    "ect",
    "pngfix",
    "zopfli",
    "optivorbis",
];

/// Resolves a logical tool name to an executable path
pub trait BinaryLocator {
    fn resolve(&self, tool: &str) -> Option<PathBuf>;

    /// Resolve a set of tools once, producing a plain lookup value
    fn locate(&self, tools: &[&str]) -> ToolPaths {
        tools
            .iter()
            .map(|tool| (tool.to_string(), self.resolve(tool)))
            .collect()
    }
}

/// Result of binary location: tool name -> path (None when unavailable)
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    paths: BTreeMap<String, Option<PathBuf>>,
}

impl ToolPaths {
    pub fn get(&self, tool: &str) -> Option<&Path> {
        self.paths.get(tool).and_then(|p| p.as_deref())
    }

    pub fn is_available(&self, tool: &str) -> bool {
        self.get(tool).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Path>)> {
        self.paths.iter().map(|(name, path)| (name.as_str(), path.as_deref()))
    }
}

impl FromIterator<(String, Option<PathBuf>)> for ToolPaths {
    fn from_iter<I: IntoIterator<Item = (String, Option<PathBuf>)>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Tool path resolver: bundled tools directories first, then system PATH
pub struct ToolPathResolver {
    tools_dirs: Vec<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver using the standard bundled locations
    pub fn new() -> Self {
        Self {
            tools_dirs: Self::detect_bundled_tools_dirs(),
        }
    }

    /// Resolver restricted to one bundled directory (plus PATH)
    pub fn with_tools_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dirs: vec![dir.into()],
        }
    }

    fn detect_bundled_tools_dirs() -> Vec<PathBuf> {
        let mut dirs_found = Vec::new();

        if let Ok(dir) = env::var("ASSET_OPTIMIZER_TOOLS") {
            dirs_found.push(PathBuf::from(dir));
        }

        if let Some(home) = dirs::home_dir() {
            dirs_found.push(home.join(".asset-optimizer").join("bin").join(env::consts::OS));
        }

        if let Ok(exe_path) = env::current_exe() {
            if let Some(app_dir) = exe_path.parent() {
                dirs_found.push(app_dir.join("tools"));
            }
        }

        dirs_found.retain(|dir| dir.is_dir());
        debug!("Bundled tools directories: {:?}", dirs_found);
        dirs_found
    }

    fn executable_name(tool: &str) -> String {
        format!("{}{}", tool, env::consts::EXE_SUFFIX)
    }

    fn find_bundled(&self, tool: &str) -> Option<PathBuf> {
        let exe = Self::executable_name(tool);
        self.tools_dirs
            .iter()
            .flat_map(|dir| [dir.join(&exe), dir.join(tool).join(&exe)])
            .find(|path| path.is_file())
    }

    fn find_in_system_path(&self, tool: &str) -> Option<PathBuf> {
        let exe = Self::executable_name(tool);
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(&exe))
            .find(|path| path.is_file())
    }

    /// Get a report of tool availability
    pub fn tools_report(&self, tools: &ToolPaths) -> String {
        let mut report = String::new();
        report.push_str("Tool Availability\n");
        report.push_str(&format!("Bundled tools dirs: {:?}\n\n", self.tools_dirs));

        for (tool, path) in tools.iter() {
            match path {
                Some(path) => report.push_str(&format!("  ✅ {} -> {}\n", tool, path.display())),
                None => report.push_str(&format!("  ❌ {} (not found, processors using it are skipped)\n", tool)),
            }
        }

        report
    }
}

impl BinaryLocator for ToolPathResolver {
    fn resolve(&self, tool: &str) -> Option<PathBuf> {
        let found = self
            .find_bundled(tool)
            .or_else(|| self.find_in_system_path(tool));
        debug!("Resolved tool {} -> {:?}", tool, found);
        found
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FixedLocator;

    impl BinaryLocator for FixedLocator {
        fn resolve(&self, tool: &str) -> Option<PathBuf> {
            (tool == "oxipng").then(|| PathBuf::from("/opt/oxipng"))
        }
    }

    #[test]
    fn test_locate_produces_plain_value() {
        let paths = FixedLocator.locate(KNOWN_TOOLS);
        assert!(paths.is_available("oxipng"));
        assert_eq!(paths.get("oxipng"), Some(Path::new("/opt/oxipng")));
        assert!(!paths.is_available("pngout"));
        assert!(!paths.is_available("never-asked"));
        assert_eq!(paths.iter().count(), KNOWN_TOOLS.len());
    }

    #[test]
    fn test_bundled_dir_is_searched() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("ect");
        std::fs::create_dir_all(&nested).unwrap();
        let exe = nested.join(format!("ect{}", env::consts::EXE_SUFFIX));
        std::fs::write(&exe, b"").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(dir.path());
        assert_eq!(resolver.resolve("ect"), Some(exe));
    }

    #[test]
    fn test_report_lists_missing_tools() {
        let resolver = ToolPathResolver::with_tools_dir("/nowhere");
        let paths: ToolPaths = [("pngout".to_string(), None)].into_iter().collect();
        let report = resolver.tools_report(&paths);
        assert!(report.contains("pngout (not found"));
    }
}
