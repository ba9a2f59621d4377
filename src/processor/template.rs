//! Immutable argument templates for external tools.

use crate::file_manager::FileKind;
use std::path::{Path, PathBuf};

/// Where the input path goes in the argument vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPosition {
    /// Directly after the binary
    Front,
    /// After the fixed flags
    Back,
}

/// How the tool is told where to write its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Output path as the last argument
    Positional,
    /// Output path glued to a flag (`--out=<path>`), placed before the input
    Flag(String),
    /// Tool writes the result to stdout
    Stdout,
    /// Tool rewrites its input argument
    InPlace,
}

/// Command template for one tool. Never mutated after construction: every
/// invocation builds a fresh argument vector through [`ProcessorSpec::build_args`].
#[derive(Debug, Clone)]
pub struct ProcessorSpec {
    tool: String,
    binary: Option<PathBuf>,
    kind: FileKind,
    args: Vec<String>,
    input: ArgPosition,
    output: OutputMode,
}

impl ProcessorSpec {
    pub fn new(
        tool: impl Into<String>,
        binary: Option<PathBuf>,
        kind: FileKind,
        args: Vec<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            binary,
            kind,
            args,
            input: ArgPosition::Back,
            output: OutputMode::Positional,
        }
    }

    /// Insert the input directly after the binary
    pub fn front(mut self) -> Self {
        self.input = ArgPosition::Front;
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Resolved executable, `None` when the tool is unavailable
    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn output_mode(&self) -> &OutputMode {
        &self.output
    }

    /// Full argument vector (without the binary) for one invocation.
    ///
    /// Variant flags follow the fixed flags. For `InPlace` tools `input` must
    /// already be the candidate copy.
    pub fn build_args(&self, input: &Path, output: &Path, variant: &[String]) -> Vec<String> {
        let input = input.to_string_lossy().into_owned();
        let mut args = Vec::with_capacity(self.args.len() + variant.len() + 2);

        if self.input == ArgPosition::Front {
            args.push(input.clone());
        }
        args.extend(self.args.iter().cloned());
        args.extend(variant.iter().cloned());

        if let OutputMode::Flag(prefix) = &self.output {
            args.push(format!("{}{}", prefix, output.display()));
        }
        if self.input == ArgPosition::Back {
            args.push(input);
        }
        if self.output == OutputMode::Positional {
            args.push(output.to_string_lossy().into_owned());
        }

        args
    }
}
